use std::str::FromStr;

use lightning_invoice::{Bolt11Invoice, Bolt11InvoiceDescriptionRef};
use serde::Serialize;

/// The parts of a decoded BOLT11 invoice the pay flow checks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DecodedInvoice {
    pub bolt11: String,
    pub amount_msat: Option<u64>,
    /// Hex encoded description hash, when the invoice commits to one.
    pub description_hash: Option<String>,
    pub payment_hash: String,
}

/// Decodes payment requests returned by LNURL-pay callbacks.
pub trait InvoiceDecoder: Send + Sync {
    fn decode(&self, bolt11: &str) -> Result<DecodedInvoice, String>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Bolt11InvoiceDecoder;

impl InvoiceDecoder for Bolt11InvoiceDecoder {
    fn decode(&self, bolt11: &str) -> Result<DecodedInvoice, String> {
        let invoice = Bolt11Invoice::from_str(bolt11.trim()).map_err(|e| e.to_string())?;

        Ok(DecodedInvoice {
            bolt11: bolt11.trim().to_string(),
            amount_msat: invoice.amount_milli_satoshis(),
            description_hash: match invoice.description() {
                Bolt11InvoiceDescriptionRef::Direct(_) => None,
                Bolt11InvoiceDescriptionRef::Hash(sha256) => Some(sha256.0.to_string()),
            },
            payment_hash: invoice.payment_hash().to_string(),
        })
    }
}
