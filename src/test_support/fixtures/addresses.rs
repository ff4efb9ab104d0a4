// Shared test fixture for address book entries.

use uuid::Uuid;

use crate::modules::addresses::core::address::Address;

pub fn make_address(owner: Uuid) -> Address {
    Address {
        id: Uuid::now_v7(),
        user_id: owner,
        recipient: "Sam Jansen".into(),
        phone: "+31 20 123 4567".into(),
        line1: "Keizersgracht 1".into(),
        line2: None,
        city: "Amsterdam".into(),
        postal_code: "1015 CJ".into(),
        country: "NL".into(),
    }
}
