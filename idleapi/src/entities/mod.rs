pub mod outage_flag;
pub mod protected_items;
