// Command data type for turning the caller's cart into an order.
//
// Purpose
// - Carry the optional address reference and note as the caller sent them.
//
// Responsibilities
// - Stay independent of the transport; parsing and validation happen in the handler.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checkout {
    pub address_id: Option<String>,
    pub note: Option<String>,
}
