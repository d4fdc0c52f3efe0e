/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a Snowflake-style i64 for use as resource ID.
///
/// Layout (53 bits, fits in JavaScript's Number.MAX_SAFE_INTEGER):
///   - 41 bits: milliseconds since 2024-01-01 UTC (~69 years)
///   - 12 bits: per-process sequence, randomly seeded (4096 ids per ms)
///
/// Orders, products and users all share this id space.
pub fn snowflake_id() -> i64 {
    use rand::Rng;
    use std::sync::LazyLock;
    use std::sync::atomic::{AtomicI64, Ordering};

    // Custom epoch: 2024-01-01 00:00:00 UTC
    const EPOCH_MS: i64 = 1_704_067_200_000;
    static SEQUENCE: LazyLock<AtomicI64> =
        LazyLock::new(|| AtomicI64::new(rand::thread_rng().gen_range(0..0x1000)));

    let now = now_millis();
    let ts = (now - EPOCH_MS) & 0x1FF_FFFF_FFFF; // 41 bits
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed) & 0xFFF; // 12 bits
    (ts << 12) | seq
}
