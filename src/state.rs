use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn},
    mail::Mailer,
    payment::PaymentGateway,
};

/// Shared handles, passed explicitly instead of living as ambient singletons.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub config: AppConfig,
    pub gateway: PaymentGateway,
    pub mailer: Mailer,
}
