//! 패턴 감지기.
//!
//! 한 타임프레임의 마감 캔들 시퀀스와 같은 시퀀스에서 계산한 존으로
//! 패턴 후보를 만듭니다.
//!
//! 처리 순서:
//! 1. 건너뛰기 조건 (미마감 캔들, 이력 부족, ATR 0)
//! 2. 기하 판정 ([`crate::patterns`])
//! 3. 거래량 게이트 (현재 거래량 ≤ 직전 평균이면 전부 거부)
//! 4. 후보별 존 게이트와 점수 ([`crate::scoring`])
//!
//! 건너뛰기는 에러가 아닙니다. 빈 결과를 돌려주고 디버그 로그만 남깁니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use trader_analytics::{AtrParams, EmaParams, IndicatorEngine, VolumeParams};
use trader_core::{
    Candle, DetectorConfig, Direction, PatternCandidate, PatternKind, ScoreBreakdown, ZoneSet,
};

use crate::patterns::{detect_shapes, PatternRules};
use crate::scoring::{has_sharp_move, trend_alignment, zone_placement, Scorer, ZonePlacement};

/// 감지를 시도하지 않은 이유.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SkipReason {
    /// 마지막 캔들이 아직 마감되지 않음
    UnclosedCandle,
    /// 마감 캔들 부족
    InsufficientHistory {
        /// 필요 개수
        required: usize,
        /// 제공된 개수
        provided: usize,
    },
    /// ATR이 0 (거래 없는 종목)
    ZeroAtr,
    /// 지표 계산 불가
    IndicatorUnavailable(String),
}

/// 기하 판정은 통과했지만 버려진 이유.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// 거래량이 직전 평균 이하
    LowVolume,
    /// 반대편 존이 더 가까움
    WrongSideZone,
    /// 점수 미달
    BelowThreshold {
        /// 합계 점수
        total: u32,
        /// 임계값
        threshold: u32,
    },
}

/// 거부된 형태.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    /// 패턴 종류
    pub kind: PatternKind,
    /// 방향
    pub direction: Direction,
    /// 사유
    pub reason: RejectReason,
    /// 점수 구성 (점수까지 계산된 경우)
    pub breakdown: Option<ScoreBreakdown>,
}

/// 감지 결과.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    /// 입장 후보
    pub candidates: Vec<PatternCandidate>,
    /// 거부된 형태
    pub rejections: Vec<Rejection>,
    /// 건너뛴 경우 그 이유
    pub skip: Option<SkipReason>,
}

impl DetectionReport {
    fn skipped(reason: SkipReason) -> Self {
        Self {
            skip: Some(reason),
            ..Self::default()
        }
    }

    /// 감지를 건너뛰었는지.
    pub fn is_skipped(&self) -> bool {
        self.skip.is_some()
    }
}

/// 패턴 감지기.
#[derive(Debug)]
pub struct PatternDetector {
    config: DetectorConfig,
    rules: PatternRules,
    scorer: Scorer,
    engine: IndicatorEngine,
}

impl PatternDetector {
    /// 새 감지기를 생성합니다.
    pub fn new(config: DetectorConfig) -> Self {
        let rules = PatternRules {
            pin_bar_wick_ratio: config.pin_bar_wick_ratio,
            pin_bar_max_body: config.pin_bar_max_body,
        };
        let scorer = Scorer::from_config(&config);
        Self {
            config,
            rules,
            scorer,
            engine: IndicatorEngine::new(),
        }
    }

    /// 설정.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// 현재 시각 기준으로 입장 후보를 찾습니다.
    pub fn detect_patterns(&self, symbol: &str, candles: &[Candle], zones: &ZoneSet) -> Vec<PatternCandidate> {
        self.detect_patterns_at(symbol, candles, zones, Utc::now())
    }

    /// `as_of` 시각 기준으로 입장 후보를 찾습니다.
    pub fn detect_patterns_at(
        &self,
        symbol: &str,
        candles: &[Candle],
        zones: &ZoneSet,
        as_of: DateTime<Utc>,
    ) -> Vec<PatternCandidate> {
        self.evaluate(symbol, candles, zones, as_of).candidates
    }

    /// 후보, 거부 사유, 건너뛰기 사유를 모두 담은 결과를 만듭니다.
    ///
    /// 후보의 타임프레임은 `zones`의 타임프레임입니다.
    pub fn evaluate(
        &self,
        symbol: &str,
        candles: &[Candle],
        zones: &ZoneSet,
        as_of: DateTime<Utc>,
    ) -> DetectionReport {
        let timeframe = zones.timeframe;
        let Some(last) = candles.last() else {
            return DetectionReport::skipped(SkipReason::InsufficientHistory {
                required: self.config.min_candles,
                provided: 0,
            });
        };

        if !last.is_closed_at(as_of) {
            debug!(symbol, timeframe = %timeframe, "last candle not closed, skipping");
            return DetectionReport::skipped(SkipReason::UnclosedCandle);
        }

        if candles.len() < self.config.min_candles {
            debug!(
                symbol,
                timeframe = %timeframe,
                required = self.config.min_candles,
                provided = candles.len(),
                "insufficient history, skipping"
            );
            return DetectionReport::skipped(SkipReason::InsufficientHistory {
                required: self.config.min_candles,
                provided: candles.len(),
            });
        }

        let atr = match self.engine.current_atr(candles, AtrParams { period: self.config.atr_period }) {
            Ok(atr) => atr,
            Err(e) => {
                warn!(symbol, timeframe = %timeframe, error = %e, "ATR unavailable");
                return DetectionReport::skipped(SkipReason::IndicatorUnavailable(e.to_string()));
            }
        };
        if atr <= Decimal::ZERO {
            debug!(symbol, timeframe = %timeframe, "zero ATR, skipping");
            return DetectionReport::skipped(SkipReason::ZeroAtr);
        }

        let shapes = detect_shapes(candles, &self.rules);
        let mut report = DetectionReport::default();
        if shapes.is_empty() {
            return report;
        }

        let volume_ratio = match self
            .engine
            .volume_ratio(candles, VolumeParams { period: self.config.volume_period })
        {
            Ok(ratio) => ratio,
            Err(e) => {
                warn!(symbol, timeframe = %timeframe, error = %e, "volume ratio unavailable");
                return DetectionReport::skipped(SkipReason::IndicatorUnavailable(e.to_string()));
            }
        };

        let volume_ratio = match volume_ratio {
            Some(ratio) if ratio > Decimal::ONE => ratio,
            other => {
                debug!(
                    symbol,
                    timeframe = %timeframe,
                    volume_ratio = ?other,
                    patterns = shapes.len(),
                    "volume gate rejected all patterns"
                );
                report.rejections = shapes
                    .iter()
                    .map(|shape| Rejection {
                        kind: shape.kind,
                        direction: shape.direction,
                        reason: RejectReason::LowVolume,
                        breakdown: None,
                    })
                    .collect();
                return report;
            }
        };

        let closes: Vec<Decimal> = candles.iter().map(|c| c.close).collect();
        let emas = self
            .engine
            .latest_ema(&closes, EmaParams { period: self.config.ema_fast })
            .and_then(|fast| {
                self.engine
                    .latest_ema(&closes, EmaParams { period: self.config.ema_slow })
                    .map(|slow| (fast, slow))
            });
        let (ema_fast, ema_slow) = match emas {
            Ok(pair) => pair,
            Err(e) => {
                warn!(symbol, timeframe = %timeframe, error = %e, "EMA unavailable");
                return DetectionReport::skipped(SkipReason::IndicatorUnavailable(e.to_string()));
            }
        };

        let entry = last.close;
        for shape in shapes {
            let placement = zone_placement(zones, shape.direction, entry, self.config.zone_proximity);
            let trend = trend_alignment(shape.direction, entry, ema_fast, ema_slow);
            let sharp = has_sharp_move(
                candles,
                shape.direction,
                atr,
                self.config.sharp_move_candles,
                self.config.sharp_move_atr,
            );

            let Some(breakdown) = self.scorer.score(&placement, trend, volume_ratio, sharp) else {
                debug!(
                    symbol,
                    pattern = %shape.kind,
                    direction = %shape.direction,
                    "opposing zone closer than backing zone"
                );
                report.rejections.push(Rejection {
                    kind: shape.kind,
                    direction: shape.direction,
                    reason: RejectReason::WrongSideZone,
                    breakdown: None,
                });
                continue;
            };

            if !self.scorer.admits(&breakdown) {
                debug!(
                    symbol,
                    pattern = %shape.kind,
                    direction = %shape.direction,
                    score = breakdown.total(),
                    "score below threshold"
                );
                report.rejections.push(Rejection {
                    kind: shape.kind,
                    direction: shape.direction,
                    reason: RejectReason::BelowThreshold {
                        total: breakdown.total(),
                        threshold: self.scorer.threshold(),
                    },
                    breakdown: Some(breakdown),
                });
                continue;
            }

            let active_zone = match placement {
                ZonePlacement::AtBacking(zone) => Some(zone),
                _ => None,
            };

            info!(
                symbol,
                timeframe = %timeframe,
                pattern = %shape.kind,
                direction = %shape.direction,
                score = breakdown.total(),
                entry = %entry,
                "pattern admitted"
            );

            report.candidates.push(PatternCandidate {
                symbol: symbol.to_string(),
                timeframe,
                direction: shape.direction,
                kind: shape.kind,
                entry_price: entry,
                signal_time: last.close_time,
                score: breakdown.normalized(),
                breakdown,
                trend,
                volume_ratio,
                active_zone,
            });
        }

        report
    }
}

impl Default for PatternDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}
