use std::time::Instant;

use actix_web::{HttpResponse, Responder, get, post, web};
use log::{info, warn};
use serde_json::json;

use super::models::{
    AppState, ChainResponse, MineRequest, MineResponse, TailResponse, VerifyResponse,
};
use crate::blockchain::{Block, ChainError, Deadline, LinkStatus, LogProgress};

/// Get the full blockchain.
#[get("/chain/")]
pub async fn get_chain(state: web::Data<AppState>) -> impl Responder {
    let bc = state.blockchain.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(ChainResponse {
        length: bc.len(),
        params: *bc.params(),
        chain: bc.blocks(),
    })
}

/// Get one block by 0-based position.
#[get("/chain/{position}/")]
pub async fn get_block(state: web::Data<AppState>, path: web::Path<usize>) -> impl Responder {
    let bc = state.blockchain.lock().expect("mutex poisoned");
    match bc.get(path.into_inner()) {
        Ok(block) => HttpResponse::Ok().json(block),
        Err(e) => HttpResponse::NotFound().json(json!({ "error": e.to_string() })),
    }
}

/// Hash a new block should record as its predecessor.
#[get("/tail/")]
pub async fn get_tail(state: web::Data<AppState>) -> impl Responder {
    let bc = state.blockchain.lock().expect("mutex poisoned");
    HttpResponse::Ok().json(TailResponse {
        tail_hash: bc.tail_hash(),
        next_id: bc.next_id(),
    })
}

/// Audit every link of the chain.
#[get("/verify/")]
pub async fn verify_chain(state: web::Data<AppState>) -> impl Responder {
    let bc = state.blockchain.lock().expect("mutex poisoned");
    let links = bc.verify();
    HttpResponse::Ok().json(VerifyResponse {
        valid: links.iter().all(|l| l.status == LinkStatus::Good),
        length: bc.len(),
        links,
        unsolved: bc.unsolved_blocks(),
    })
}

/// Mine a block carrying `payload` on top of the tail. The search runs on the
/// blocking pool against a snapshot of the tail, without holding the chain
/// lock; the block is only appended if the tail has not moved meanwhile.
#[post("/mine/")]
pub async fn mine_block(state: web::Data<AppState>, req: web::Json<MineRequest>) -> impl Responder {
    let payload = req.into_inner().payload;
    let (id, previous_hash, params) = {
        let bc = state.blockchain.lock().expect("mutex poisoned");
        (bc.next_id(), bc.tail_hash(), *bc.params())
    };
    let worker = state.clone();
    let started = Instant::now();

    let mined = web::block(move || -> Result<Block, ChainError> {
        let mut observer = (
            LogProgress { block_id: id },
            worker.mining_timeout.map(Deadline::after),
        );
        let block = Block::mine(
            id,
            payload,
            previous_hash,
            &params,
            &worker.limits,
            &mut observer,
        )?;
        let mut bc = worker.blockchain.lock().expect("mutex poisoned");
        bc.append_mined(block).cloned()
    })
    .await;

    match mined {
        Ok(Ok(block)) => {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            info!("API - mined block #{} in {} ms", block.id(), elapsed_ms);
            HttpResponse::Ok().json(MineResponse { block, elapsed_ms })
        }
        Ok(Err(ChainError::Mining(e))) => {
            warn!("API - mining gave up: {}", e);
            HttpResponse::UnprocessableEntity().json(json!({ "error": e.to_string() }))
        }
        Ok(Err(e @ ChainError::StaleTail { .. })) => {
            warn!("API - discarding mined block: {}", e);
            HttpResponse::Conflict().json(json!({ "error": e.to_string() }))
        }
        Ok(Err(e)) => HttpResponse::InternalServerError().json(json!({ "error": e.to_string() })),
        Err(_) => HttpResponse::InternalServerError().body("mining worker failed"),
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{App, http::StatusCode, test, web};
    use serde_json::Value;

    use crate::api::{AppState, init_routes};
    use crate::blockchain::digest::COMPACT_DIGEST_MODULUS;
    use crate::blockchain::{Block, Blockchain, MiningLimits, PowParams};

    fn state_with(payloads: &[&str]) -> web::Data<AppState> {
        let params = PowParams::new(COMPACT_DIGEST_MODULUS, 100).unwrap();
        let limits = MiningLimits::for_params(&params);
        let mut bc = Blockchain::new(params);
        for p in payloads {
            bc.mine_block(*p, &limits, &mut ()).unwrap();
        }
        web::Data::new(AppState::new(bc, limits, None))
    }

    #[actix_web::test]
    async fn health_is_up() {
        let state = web::Data::new(AppState::default());
        let app = test::init_service(App::new().app_data(state).configure(init_routes)).await;
        let req = test::TestRequest::get().uri("/api/v1/health/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn chain_lists_blocks() {
        let state = state_with(&["a", "b"]);
        let app =
            test::init_service(App::new().app_data(state.clone()).configure(init_routes)).await;
        let req = test::TestRequest::get().uri("/api/v1/chain/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["length"], 2);
        assert_eq!(body["chain"][1]["payload"], "b");
        assert_eq!(body["params"]["target_modulus"], 100);
    }

    #[actix_web::test]
    async fn block_lookup_and_out_of_range() {
        let state = state_with(&["a"]);
        let app =
            test::init_service(App::new().app_data(state.clone()).configure(init_routes)).await;

        let req = test::TestRequest::get().uri("/api/v1/chain/0/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["id"], 0);

        let req = test::TestRequest::get().uri("/api/v1/chain/5/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn mine_then_verify() {
        let state = state_with(&["a"]);
        let app =
            test::init_service(App::new().app_data(state.clone()).configure(init_routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/mine/")
            .set_json(serde_json::json!({ "payload": "b" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["block"]["id"], 1);
        assert_eq!(body["block"]["payload"], "b");

        let req = test::TestRequest::get().uri("/api/v1/tail/").to_request();
        let tail: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(tail["tail_hash"], body["block"]["hash"]);
        assert_eq!(tail["next_id"], 2);

        let req = test::TestRequest::get().uri("/api/v1/verify/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["valid"], true);
        assert_eq!(body["links"][0]["status"], "GOOD");
    }

    #[actix_web::test]
    async fn verify_flags_bad_link() {
        let state = state_with(&["a"]);
        {
            let mut bc = state.blockchain.lock().unwrap();
            let stray = Block::from_parts(bc.next_id(), "stray", 1, 1, bc.params());
            bc.append(stray);
        }
        let app =
            test::init_service(App::new().app_data(state.clone()).configure(init_routes)).await;
        let req = test::TestRequest::get().uri("/api/v1/verify/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["valid"], false);
        assert_eq!(body["links"][0]["status"], "BAD");
        assert_eq!(body["unsolved"][0], 1);
    }

    #[actix_web::test]
    async fn block_mined_on_old_tail_is_rejected() {
        let state = state_with(&["a"]);
        let app =
            test::init_service(App::new().app_data(state.clone()).configure(init_routes)).await;
        // mined on the old tail, as a concurrent request would have
        let stale = {
            let bc = state.blockchain.lock().unwrap();
            let limits = MiningLimits::for_params(bc.params());
            Block::mine(bc.next_id(), "late", bc.tail_hash(), bc.params(), &limits, &mut ())
                .unwrap()
        };
        let req = test::TestRequest::post()
            .uri("/api/v1/mine/")
            .set_json(serde_json::json!({ "payload": "b" }))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        let mut bc = state.blockchain.lock().unwrap();
        assert!(matches!(
            bc.append_mined(stale),
            Err(crate::blockchain::ChainError::StaleTail { .. })
        ));
        assert_eq!(bc.len(), 2);
    }

    #[actix_web::test]
    async fn exhausted_budget_is_unprocessable() {
        let params = PowParams::new(COMPACT_DIGEST_MODULUS, 1_000_000).unwrap();
        let limits = MiningLimits {
            max_attempts: Some(0),
            progress_interval: 1,
        };
        let state = web::Data::new(AppState::new(Blockchain::new(params), limits, None));
        let app =
            test::init_service(App::new().app_data(state.clone()).configure(init_routes)).await;
        let req = test::TestRequest::post()
            .uri("/api/v1/mine/")
            .set_json(serde_json::json!({ "payload": "x" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(state.blockchain.lock().unwrap().is_empty());
    }
}
