pub mod catalog;
pub mod config;
pub mod err;
pub mod feedback;
pub mod io;
pub mod ledger;
pub mod models;
pub mod notify;
pub mod routes;

use axum::http::Uri;
use axum::response::IntoResponse;
use axum::Json;
use clap::Parser;
use serde::Serialize;

use crate::config::Config;
use crate::err::{Error, Fine, Maybe, Nothing};
use crate::io::RecordStore;

pub type Payload<T> = Result<Json<Maybe<T>>, Error>;

pub fn proceeds<V>(value: V) -> Payload<V> where V: Serialize {
    Ok(Json(Fine(value)))
}

pub fn breaks<V>(err: Error) -> Payload<V> where V: Serialize {
    Ok(Json(Nothing(err)))
}

/// Answers rejections in the envelope and lets storage failures abort the request.
pub fn settles<V>(result: Result<V, Error>) -> Payload<V> where V: Serialize {
    match result {
        Ok(value) => proceeds(value),
        Err(err) if err.is_fatal() => {
            log::error!("{}", err);
            Err(err)
        }
        Err(err) => {
            log::debug!("Rejected: {}", err);
            breaks(err)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = Config::parse();

    let store = RecordStore::new(&config.data_dir);
    store.prepare_io().await?;
    catalog::seed_if_absent(&store).await?;

    let app = routes::app(store);
    log::info!(
        "Starting Coursebook HTTP Server on http://{} with records in {}",
        config.addr,
        config.data_dir.display()
    );
    axum::Server::bind(&config.addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
