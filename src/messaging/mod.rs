// Messaging - lock-free channels between device threads, the session loop and a front-end

pub mod channels;
pub mod command;
pub mod notification;
