use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, TextEncoder};

static RECORDS_RECEIVED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "rental_service_records_received_total",
        "Book events delivered to rental-service",
    )
    .expect("failed to create rental_service_records_received_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register rental_service_records_received_total");
    counter
});

static RECORDS_FILTERED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "rental_service_records_filtered_total",
        "Book events dropped because their category is not accepted",
    )
    .expect("failed to create rental_service_records_filtered_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register rental_service_records_filtered_total");
    counter
});

static RECORDS_APPLIED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "rental_service_records_applied_total",
        "Book events applied to the store",
    )
    .expect("failed to create rental_service_records_applied_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register rental_service_records_applied_total");
    counter
});

static RECORDS_DEAD_LETTERED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "rental_service_records_dead_lettered_total",
            "Book events routed to the dead-letter topic",
        ),
        &["result"],
    )
    .expect("failed to create rental_service_records_dead_lettered_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register rental_service_records_dead_lettered_total");
    counter
});

static BATCH_RETRIES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "rental_service_batch_retries_total",
        "Batch re-deliveries triggered by processing failures",
    )
    .expect("failed to create rental_service_batch_retries_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register rental_service_batch_retries_total");
    counter
});

pub fn record_received(count: usize) {
    RECORDS_RECEIVED_TOTAL.inc_by(count as u64);
}

pub fn record_filtered(count: usize) {
    RECORDS_FILTERED_TOTAL.inc_by(count as u64);
}

pub fn record_applied(count: usize) {
    RECORDS_APPLIED_TOTAL.inc_by(count as u64);
}

pub fn record_dead_lettered(published: bool) {
    let result = if published { "published" } else { "failed" };
    RECORDS_DEAD_LETTERED_TOTAL
        .with_label_values(&[result])
        .inc();
}

pub fn record_batch_retry() {
    BATCH_RETRIES_TOTAL.inc();
}

pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
