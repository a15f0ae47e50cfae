use axum::{
    Router,
    routing::{delete, get, post},
};
use diesel::{
    SqliteConnection,
    r2d2::{ConnectionManager, Pool},
};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

mod api;
mod app;
mod error;
mod mistakes;
mod model;
mod quiz;
mod review;
mod schema;
mod shuffle;
mod srs;
mod stats;
mod store;
mod study;

use app::FlashcardApp;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub core: Arc<Mutex<FlashcardApp>>,
}

#[tokio::main]
async fn main() {
    // Database configuration
    dotenv::dotenv().ok();
    env_logger::init();
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://flashcards.db".into());

    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = Pool::builder()
        .build(manager)
        .expect("Failed to create DB pool");

    // Restore the scheduler from whatever the last session left behind
    let snapshot = {
        let mut conn = pool.get().expect("Failed to check out a DB connection");
        match store::load_snapshot(&mut conn) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                eprintln!("Failed to load stored state: {}", e);
                std::process::exit(1);
            }
        }
    };
    let core = FlashcardApp::from_snapshot(snapshot, &mut rand::thread_rng());
    log::info!(
        "Loaded {} cards, {} mistakes outstanding",
        core.cards().len(),
        core.mistakes().len()
    );

    let state = AppState {
        pool,
        core: Arc::new(Mutex::new(core)),
    };

    // Library API router
    let cards_router = Router::new()
        .route(
            "/",
            get(api::list_cards)
                .post(api::create_cards)
                .delete(api::clear_cards),
        )
        .route("/{position}", delete(api::delete_card))
        .route("/{position}/rate", post(api::rate_card));

    // Session mode routers
    let study_router = Router::new()
        .route("/", get(api::study_state))
        .route("/answer", post(api::study_answer));
    let review_router = Router::new()
        .route("/", get(api::review_state))
        .route("/answer", post(api::review_answer));
    let quiz_router = Router::new()
        .route("/", get(api::quiz_state))
        .route("/start", post(api::start_quiz))
        .route("/answer", post(api::quiz_answer));

    // Combined API router
    let api_router = Router::new()
        .nest("/cards", cards_router)
        .nest("/study", study_router)
        .nest("/review", review_router)
        .nest("/quiz", quiz_router)
        .route("/stats", get(api::overall_stats))
        .route("/reset", post(api::reset_progress));

    let app = Router::new().nest("/api", api_router).with_state(state);

    // Start server
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:5000".into());
    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to address: {}", e);
            std::process::exit(1);
        }
    };

    println!("Server running on http://{}", bind_addr);

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
