//! Invoice numbering and draft synthesis.

pub mod draft;
pub mod numbering;

pub use draft::{ensure_invoice, InvoiceLineItem};
