use std::sync::LazyLock;

use prometheus::*;

static METRIC_REGISTRATION_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "memecanon_registration_count",
        "count of registration attempts by outcome",
        &["outcome"]
    )
    .unwrap()
});

static METRIC_REGISTRATION_BUMP: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!(
        "memecanon_registration_bump",
        "bump of the derived address of each new registration",
        (240..=255).map(|x| x as f64).collect()
    )
    .unwrap()
});

static METRIC_PROCESS_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "memecanon_process_duration",
        "duration of the per-submission processing in seconds",
        &["stage"]
    )
    .unwrap()
});

/// 增加注册结果计数
pub fn inc_registration(outcome: &str) {
    METRIC_REGISTRATION_COUNT.with_label_values(&[outcome]).inc();
}

pub fn observe_bump(bump: u8) {
    METRIC_REGISTRATION_BUMP.observe(bump as f64);
}

/// 记录处理阶段耗时，`stage` 为 embed 或 register
pub fn observe_process_duration(stage: &str, duration: f32) {
    METRIC_PROCESS_DURATION.with_label_values(&[stage]).observe(duration as f64);
}

/// 以文本格式导出所有指标
pub fn gather_text() -> Result<String> {
    TextEncoder::new().encode_to_string(&gather())
}
