use std::sync::Arc;

use crate::{
    db::{DbPool, OrmConn, orm_from_pool},
    notify::{LogNotifier, Notifier},
    settings::SiteSettings,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub settings: SiteSettings,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(pool: DbPool, settings: SiteSettings) -> Self {
        let orm = orm_from_pool(&pool);
        Self {
            pool,
            orm,
            settings,
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }
}
