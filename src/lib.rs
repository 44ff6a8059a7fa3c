pub mod admin;
pub mod bot;
pub mod channels;
pub mod config;
pub mod conversations;
pub mod handoff;
pub mod i18n;
pub mod menus;
pub mod shared;
pub mod staff;
pub mod users;
pub mod web_server;
