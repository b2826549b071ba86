pub mod rest;

use crate::query::QueryService;
use actix_cors::Cors;
use actix_web::{middleware, web::Data, App, HttpServer};
use tracing::info;

use self::rest::{chain, delegations, validators};

pub async fn start_web_server(service: QueryService, port: u16) -> std::io::Result<()> {
    info!("Starting query API on port {port}");
    HttpServer::new(move || {
        App::new()
            .app_data(Data::new(service.clone()))
            .service(delegations::get_delegator_list)
            .service(delegations::get_delegator_history)
            .service(delegations::get_validator_history)
            .service(validators::get_commission_records)
            .service(validators::get_reward_history)
            .service(chain::get_stake_history)
            .service(chain::get_height)
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
