pub mod delivery_callback;
pub mod inbox;
pub mod send_notification;
