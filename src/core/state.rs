use std::sync::Arc;

use sqlx::PgPool;

use crate::core::{config::Settings, redis::RedisHandle};
use crate::repositories::{
    AccessDirectory, AttemptRepository, PgAccessDirectory, PgAttemptRepository,
    PgQuestionCatalog, QuestionCatalog,
};
use crate::services::answer_store::AnswerStore;
use crate::services::attempt_lifecycle::AttemptLifecycle;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    redis: RedisHandle,
    stores: Stores,
}

/// Storage seams the attempt services run against.
#[derive(Clone)]
pub(crate) struct Stores {
    pub(crate) attempts: Arc<dyn AttemptRepository>,
    pub(crate) catalog: Arc<dyn QuestionCatalog>,
    pub(crate) access: Arc<dyn AccessDirectory>,
}

impl Stores {
    pub(crate) fn postgres(pool: &PgPool) -> Self {
        Self {
            attempts: Arc::new(PgAttemptRepository::new(pool.clone())),
            catalog: Arc::new(PgQuestionCatalog::new(pool.clone())),
            access: Arc::new(PgAccessDirectory::new(pool.clone())),
        }
    }
}

impl AppState {
    pub(crate) fn new(settings: Settings, db: PgPool, redis: RedisHandle, stores: Stores) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, redis, stores }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    pub(crate) fn access(&self) -> &Arc<dyn AccessDirectory> {
        &self.inner.stores.access
    }

    pub(crate) fn lifecycle(&self) -> AttemptLifecycle {
        let stores = &self.inner.stores;
        AttemptLifecycle::new(stores.attempts.clone(), stores.catalog.clone(), stores.access.clone())
    }

    pub(crate) fn answer_store(&self) -> AnswerStore {
        let stores = &self.inner.stores;
        AnswerStore::new(stores.attempts.clone(), stores.catalog.clone())
    }
}
