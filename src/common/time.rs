//! 时间工具

use std::time::{SystemTime, UNIX_EPOCH};

/// 当前 epoch 毫秒时间戳
/// 读数与报警的 rtc 统一使用毫秒，入口处为 0 时以此打点
pub fn current_rtc() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_rtc_is_millisecond_scale() {
        let rtc = current_rtc();
        // 2020-01-01 之后，毫秒量级
        assert!(rtc > 1_577_836_800_000);
    }
}
