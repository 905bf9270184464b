mod mock_http_client;
mod mock_invoice_decoder;

pub use mock_http_client::{MockHttpClient, MockResponse};
pub use mock_invoice_decoder::MockInvoiceDecoder;
