//! Order stage signals
//!
//! The order aggregate is owned elsewhere; quote negotiation only tells it
//! which stage it should move to.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Markup applied to an accepted vendor price to get the customer quotation
/// amount (30% margin + 5% operating cost)
pub const QUOTATION_MARKUP: Decimal = Decimal::from_parts(135, 0, 0, false, 2);

/// Stage of an order in the sourcing pipeline
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStage {
    VendorSourcing,
    VendorNegotiation,
    CustomerQuote,
}

impl OrderStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStage::VendorSourcing => "vendor_sourcing",
            OrderStage::VendorNegotiation => "vendor_negotiation",
            OrderStage::CustomerQuote => "customer_quote",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "vendor_sourcing" => Some(OrderStage::VendorSourcing),
            "vendor_negotiation" => Some(OrderStage::VendorNegotiation),
            "customer_quote" => Some(OrderStage::CustomerQuote),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStage::VendorSourcing => write!(f, "Vendor Sourcing"),
            OrderStage::VendorNegotiation => write!(f, "Vendor Negotiation"),
            OrderStage::CustomerQuote => write!(f, "Customer Quote"),
        }
    }
}

/// Instruction for the order aggregate emitted by a negotiation action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum OrderStageSignal {
    /// A quote was accepted: record the vendor price and move on to the
    /// customer quotation
    AdvanceToCustomerQuote {
        vendor_quoted_price: Decimal,
        quotation_amount: Decimal,
    },
    /// The last active quote was rejected: the order needs a new vendor
    RevertToVendorSourcing,
}

impl OrderStageSignal {
    pub fn advance_for(vendor_quoted_price: Decimal) -> Self {
        OrderStageSignal::AdvanceToCustomerQuote {
            vendor_quoted_price,
            quotation_amount: (vendor_quoted_price * QUOTATION_MARKUP).round_dp(2),
        }
    }

    /// Stage the order ends up in after the signal is applied
    pub fn target_stage(&self) -> OrderStage {
        match self {
            OrderStageSignal::AdvanceToCustomerQuote { .. } => OrderStage::CustomerQuote,
            OrderStageSignal::RevertToVendorSourcing => OrderStage::VendorSourcing,
        }
    }
}
