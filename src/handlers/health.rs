use actix_web::{web::Data, HttpResponse};
use serde_json::json;

use crate::services::subscription::SubscriptionService;

pub async fn health_check(app: Data<SubscriptionService>) -> HttpResponse {
    let stats = app.queue().stats();
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "tasks": {
            "recompute_runs": stats.recompute_runs,
            "comment_runs": stats.comment_runs,
            "collapsed": stats.collapsed,
            "failed": stats.failed,
        }
    }))
}
