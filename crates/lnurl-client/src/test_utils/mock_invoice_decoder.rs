use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use crate::invoice::{DecodedInvoice, InvoiceDecoder};

/// Decodes only the invoices it was given, keyed by their bolt11 string.
#[derive(Default)]
pub struct MockInvoiceDecoder {
    invoices: Mutex<HashMap<String, DecodedInvoice>>,
}

impl MockInvoiceDecoder {
    pub fn new() -> Self {
        MockInvoiceDecoder::default()
    }

    pub fn add_invoice(
        &self,
        bolt11: &str,
        amount_msat: Option<u64>,
        description_hash: Option<String>,
    ) -> &Self {
        self.invoices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                bolt11.to_string(),
                DecodedInvoice {
                    bolt11: bolt11.to_string(),
                    amount_msat,
                    description_hash,
                    payment_hash: "00".repeat(32),
                },
            );
        self
    }
}

impl InvoiceDecoder for MockInvoiceDecoder {
    fn decode(&self, bolt11: &str) -> Result<DecodedInvoice, String> {
        self.invoices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(bolt11)
            .cloned()
            .ok_or_else(|| format!("unknown invoice {bolt11}"))
    }
}
