mod company;
mod document;
mod inventory;
mod messaging;
mod models;
mod operations;
mod permission;
mod sales;

pub use company::*;
pub use document::{Collection, Document, Lifecycle, Record, Tracked, display_label, round_money};
pub use inventory::*;
pub use messaging::*;
pub use models::*;
pub use operations::*;
pub use permission::*;
pub use sales::{
    Client, ClientRef, CostEstimate, DEFAULT_VAT_RATE, LineItem, Proposal, ProposalProduct,
    ProposalTemplate, Quotation, SalesStatus, Totals,
};
pub(crate) use sales::validate_email;
