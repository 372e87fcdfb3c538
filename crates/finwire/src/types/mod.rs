//! # Response Shapes
//!
//! Serde mirrors of the remote API's JSON payloads. Fields the API omits for
//! some instruments are `Option`; no further validation is applied.
//!
//! | Module | Types |
//! |--------|-------|
//! | [`quote`] | [`Quote`], [`QuoteShort`], [`HistoricalBar`], [`HistoricalPrices`], [`SymbolListing`] |
//! | [`company`] | [`CompanyProfile`], [`KeyExecutive`], [`MarketCap`] |
//! | [`statements`] | [`IncomeStatement`], [`BalanceSheet`], [`CashFlowStatement`], [`Period`] |
//! | [`analyst`] | [`AnalystEstimate`], [`PriceTargetConsensus`], [`StockGrade`] |
//! | [`insider`] | [`InsiderTrade`], [`InsiderStatistics`] |
//! | [`esg`] | [`EsgDisclosure`], [`EsgRating`] |
//! | [`market`] | [`MarketMover`], [`SectorPerformance`] |
//! | [`calendar`] | [`EarningsEvent`], [`DividendEvent`], [`SplitEvent`], [`IpoEvent`] |

pub mod analyst;
pub mod calendar;
pub mod company;
pub mod esg;
pub mod insider;
pub mod market;
pub mod quote;
pub mod statements;

pub use analyst::{AnalystEstimate, PriceTargetConsensus, StockGrade};
pub use calendar::{DividendEvent, EarningsEvent, IpoEvent, SplitEvent};
pub use company::{CompanyProfile, KeyExecutive, MarketCap};
pub use esg::{EsgDisclosure, EsgRating};
pub use insider::{InsiderStatistics, InsiderTrade};
pub use market::{MarketMover, SectorPerformance};
pub use quote::{HistoricalBar, HistoricalPrices, Quote, QuoteShort, SymbolListing};
pub use statements::{BalanceSheet, CashFlowStatement, IncomeStatement, Period};
