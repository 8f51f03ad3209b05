/// Application context and dependency injection
use crate::{
    account::AccountManager,
    achievements::AchievementManager,
    audit::AuditLogger,
    config::ServerConfig,
    credits::CreditManager,
    db,
    error::ApiResult,
    events::EventManager,
    goals::GoalManager,
    interests::InterestManager,
    mailer::Mailer,
    notifications::{EventBus, NotificationDispatcher, NotificationManager},
    portfolio::PortfolioManager,
    rate_limit::{RateLimitConfig, RateLimiter},
    reports::StatsAggregator,
    sanctions::SanctionManager,
    students::StudentManager,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub accounts: Arc<AccountManager>,
    pub students: Arc<StudentManager>,
    pub credits: Arc<CreditManager>,
    pub goals: Arc<GoalManager>,
    pub interests: Arc<InterestManager>,
    pub achievements: Arc<AchievementManager>,
    pub sanctions: Arc<SanctionManager>,
    pub events: Arc<EventManager>,
    pub portfolios: Arc<PortfolioManager>,
    pub notifications: Arc<NotificationManager>,
    pub stats: Arc<StatsAggregator>,
    pub audit: Arc<AuditLogger>,
    pub bus: EventBus,
    pub rate_limiter: Arc<RateLimiter>,
    pub mailer: Arc<Mailer>,
}

impl AppContext {
    /// Create a new application context from configuration. Spawns the
    /// notification dispatcher on the bus.
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        // Validate configuration
        config.validate()?;

        // Initialize database
        let pool = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        let config = Arc::new(config);

        // Mailer and the notification pipeline
        let mailer = Arc::new(Mailer::new(config.email.clone())?);
        let notifications = Arc::new(NotificationManager::new(pool.clone()));
        let (bus, rx) = EventBus::channel();
        let dispatcher = NotificationDispatcher::new(
            pool.clone(),
            (*notifications).clone(),
            Arc::clone(&mailer),
        );
        tokio::spawn(dispatcher.run(rx));

        // Domain managers
        let accounts = Arc::new(AccountManager::new(pool.clone(), Arc::clone(&config)));
        let students = Arc::new(StudentManager::new(pool.clone()));
        let credits = Arc::new(CreditManager::new(pool.clone(), bus.clone()));
        let goals = Arc::new(GoalManager::new(pool.clone()));
        let interests = Arc::new(InterestManager::new(pool.clone()));
        let achievements = Arc::new(AchievementManager::new(pool.clone()));
        let sanctions = Arc::new(SanctionManager::new(pool.clone(), bus.clone()));
        let events = Arc::new(EventManager::new(pool.clone(), bus.clone()));
        let portfolios = Arc::new(PortfolioManager::new(pool.clone()));
        let stats = Arc::new(StatsAggregator::new(pool.clone()));
        let audit = Arc::new(AuditLogger::new(pool.clone()));

        // Rate limiter
        let rate_limiter = Arc::new(RateLimiter::new(RateLimitConfig::from(&config.rate_limit)));

        Ok(Self {
            config,
            db: pool,
            accounts,
            students,
            credits,
            goals,
            interests,
            achievements,
            sanctions,
            events,
            portfolios,
            notifications,
            stats,
            audit,
            bus,
            rate_limiter,
            mailer,
        })
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        self.config.service.public_url.clone()
    }
}
