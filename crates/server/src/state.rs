use crate::{config::Config, db::Database, mail::Mailer, notify::NotificationHub};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub notifications: Arc<NotificationHub>,
    pub mailer: Arc<Mailer>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        let mailer = Arc::new(Mailer::new(config.smtp.clone()));
        Self {
            db,
            config,
            notifications: Arc::new(NotificationHub::new()),
            mailer,
        }
    }
}
