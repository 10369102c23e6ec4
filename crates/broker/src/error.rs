use portfolio::PortfolioError;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Currency '{0}' is not available in the universe")]
    UnsupportedCurrency(String),

    #[error("Asset '{0}' is not present in the universe")]
    UnknownAsset(String),

    #[error("Portfolio with ID '{0}' does not exist")]
    UnknownPortfolio(String),

    #[error("Portfolio with ID '{0}' already exists")]
    DuplicatePortfolio(String),

    #[error("No market quote available for asset '{asset}'; order '{order_id}' was not executed")]
    MissingQuote { asset: String, order_id: String },

    #[error("Quote '{price}' for asset '{asset}' must be positive; order '{order_id}' was not executed")]
    InvalidQuote {
        asset: String,
        price: Decimal,
        order_id: String,
    },

    #[error("Cannot credit or debit negative amount '{amount}'")]
    NegativeAmount { amount: Decimal },

    #[error("{context} of {requested} {currency} exceeds the available balance of {available}")]
    InsufficientFunds {
        context: &'static str,
        currency: String,
        requested: Decimal,
        available: Decimal,
    },

    #[error(transparent)]
    Portfolio(#[from] PortfolioError),
}
