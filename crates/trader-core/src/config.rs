//! 설정 관리.
//!
//! 존 탐지, 패턴 감지, 리스크 계산, 라이프사이클, 스캐너의 모든 임계값과
//! 가중치를 정의합니다. 기본값은 운영 기준값이며 TOML 파일과 `TRADER__`
//! 환경 변수로 덮어쓸 수 있습니다.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::PartialCloseSplit;
use crate::error::{TraderError, TraderResult};
use crate::types::Timeframe;

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// 로깅 설정
    pub logging: LoggingConfig,
    /// 존 탐지 설정
    pub zones: ZoneFinderConfig,
    /// 패턴 감지 설정
    pub detector: DetectorConfig,
    /// 리스크 계산 설정
    pub risk: RiskProfileConfig,
    /// 라이프사이클 설정
    pub lifecycle: LifecycleConfig,
    /// 스캐너 설정
    pub scanner: ScannerConfig,
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
    /// 스캔/체크 span의 시작과 종료를 기록할지 여부
    pub span_events: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            span_events: false,
        }
    }
}

/// 존 탐지 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ZoneFinderConfig {
    /// 스윙 판정 시 좌우로 비교할 캔들 수
    pub swing_strength: usize,
    /// 스윙 가격을 같은 존으로 묶는 허용 오차 (가격 대비 비율)
    pub cluster_tolerance: Decimal,
    /// 존으로 인정할 최소 터치 수
    pub min_touches: u32,
    /// 존 탐지에 사용할 최근 캔들 수
    pub lookback: usize,
}

impl Default for ZoneFinderConfig {
    fn default() -> Self {
        Self {
            swing_strength: 2,
            cluster_tolerance: dec!(0.003),
            min_touches: 2,
            lookback: 300,
        }
    }
}

/// 입장 점수 가중치.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// 올바른 쪽 존 위
    pub at_zone: u32,
    /// 주변에 존 없음
    pub no_zone: u32,
    /// 추세 정렬
    pub trend_with: u32,
    /// 추세 중립
    pub trend_neutral: u32,
    /// 거래량 강함 (> 1.5배)
    pub volume_strong: u32,
    /// 거래량 보통 (> 1.0배)
    pub volume_moderate: u32,
    /// 직전 급등락 없음
    pub no_sharp_move: u32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            at_zone: 100,
            no_zone: 50,
            trend_with: 30,
            trend_neutral: 15,
            volume_strong: 30,
            volume_moderate: 15,
            no_sharp_move: 20,
        }
    }
}

/// 패턴 감지 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// 감지에 필요한 최소 마감 캔들 수
    pub min_candles: usize,
    /// ATR 기간
    pub atr_period: usize,
    /// 거래량 평균 기간
    pub volume_period: usize,
    /// 빠른 EMA 기간
    pub ema_fast: usize,
    /// 느린 EMA 기간
    pub ema_slow: usize,
    /// 존 근접 판정 비율 (가격 대비)
    pub zone_proximity: Decimal,
    /// 입장 점수 임계값 (이상이면 입장)
    pub admission_threshold: u32,
    /// 핀바 꼬리/몸통 최소 배수
    pub pin_bar_wick_ratio: Decimal,
    /// 핀바 몸통/범위 최대 비율
    pub pin_bar_max_body: Decimal,
    /// 강한 거래량 비율
    pub volume_strong_ratio: Decimal,
    /// 보통 거래량 비율
    pub volume_moderate_ratio: Decimal,
    /// 급등락 판정 연속 캔들 수
    pub sharp_move_candles: usize,
    /// 급등락 판정 누적 이동 (ATR 배수)
    pub sharp_move_atr: Decimal,
    /// 점수 가중치
    pub weights: ScoreWeights,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_candles: 300,
            atr_period: 14,
            volume_period: 20,
            ema_fast: 50,
            ema_slow: 200,
            zone_proximity: dec!(0.005),
            admission_threshold: 130,
            pin_bar_wick_ratio: dec!(2),
            pin_bar_max_body: dec!(0.35),
            volume_strong_ratio: dec!(1.5),
            volume_moderate_ratio: dec!(1.0),
            sharp_move_candles: 3,
            sharp_move_atr: dec!(1.5),
            weights: ScoreWeights::default(),
        }
    }
}

/// 동적 최소 R:R 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MinRrConfig {
    /// 기본값
    pub base: Decimal,
    /// 하한
    pub floor: Decimal,
    /// 상한
    pub cap: Decimal,
    /// 고득점 기준 (이상)
    pub high_score: u8,
    /// 고득점 조정
    pub high_score_adj: Decimal,
    /// 저득점 기준 (이하)
    pub low_score: u8,
    /// 저득점 조정
    pub low_score_adj: Decimal,
    /// 미테스트 존 조정
    pub untested_adj: Decimal,
    /// 과다 테스트 기준 (이상)
    pub heavily_tested: u32,
    /// 과다 테스트 조정
    pub heavily_tested_adj: Decimal,
    /// 추세 순행 조정
    pub trend_with_adj: Decimal,
    /// 추세 역행 조정
    pub trend_against_adj: Decimal,
    /// 다중 타임프레임 정렬 조정
    pub alignment_adj: Decimal,
    /// 정렬 판정 거리 (ATR(15m) 배수)
    pub alignment_atr: Decimal,
    /// 고변동성 조정
    pub high_volatility_adj: Decimal,
}

impl Default for MinRrConfig {
    fn default() -> Self {
        Self {
            base: dec!(1.2),
            floor: dec!(0.8),
            cap: dec!(2.5),
            high_score: 8,
            high_score_adj: dec!(-0.1),
            low_score: 5,
            low_score_adj: dec!(0.2),
            untested_adj: dec!(-0.2),
            heavily_tested: 3,
            heavily_tested_adj: dec!(0.3),
            trend_with_adj: dec!(-0.1),
            trend_against_adj: dec!(0.3),
            alignment_adj: dec!(-0.1),
            alignment_atr: dec!(0.5),
            high_volatility_adj: dec!(0.2),
        }
    }
}

/// 리스크 프로파일 계산 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RiskProfileConfig {
    /// 1시간봉 반대 존 비토 거리 (ATR(1h) 배수)
    pub veto_h1_atr: Decimal,
    /// 15분봉 반대 존 비토 거리 (ATR(15m) 배수)
    pub veto_m15_atr: Decimal,
    /// 스윙 극값 탐색 캔들 수
    pub swing_lookback: usize,
    /// ATR 기간
    pub atr_period: usize,
    /// 평균 ATR 기간
    pub atr_average_period: usize,
    /// 저변동성 기준 (현재/평균 ATR 미만)
    pub low_volatility_ratio: Decimal,
    /// 고변동성 기준 (현재/평균 ATR 초과)
    pub high_volatility_ratio: Decimal,
    /// 저변동성 버퍼 (ATR 배수)
    pub buffer_low: Decimal,
    /// 보통 변동성 버퍼
    pub buffer_normal: Decimal,
    /// 고변동성 버퍼
    pub buffer_high: Decimal,
    /// 라운드 넘버 근접 비율
    pub round_number_proximity: Decimal,
    /// 라운드 넘버 회피 거리 (ATR 배수)
    pub round_number_push_atr: Decimal,
    /// 받침 존 최소 여유 (ATR(15m) 배수)
    pub zone_clearance_atr: Decimal,
    /// 가용 공간 계수
    pub room_factor: Decimal,
    /// 가용 R 내림 단위
    pub room_step: Decimal,
    /// 고정 익절 R 배수
    pub tp_multiples: [Decimal; 3],
    /// 존 익절가를 진입가 쪽으로 당기는 비율
    pub zone_tp_pullback: Decimal,
    /// 존 익절 무시 거리 (R 배수)
    pub zone_tp_max_r: Decimal,
    /// TP1 최소 거리 (R 배수)
    pub tp1_min_r: Decimal,
    /// 존 테스트 빈도 집계 기간 (시간)
    pub zone_test_window_hours: i64,
    /// 동적 최소 R:R
    pub min_rr: MinRrConfig,
}

impl Default for RiskProfileConfig {
    fn default() -> Self {
        Self {
            veto_h1_atr: dec!(0.7),
            veto_m15_atr: dec!(1.0),
            swing_lookback: 5,
            atr_period: 14,
            atr_average_period: 14,
            low_volatility_ratio: dec!(0.8),
            high_volatility_ratio: dec!(1.5),
            buffer_low: dec!(0.3),
            buffer_normal: dec!(0.4),
            buffer_high: dec!(0.5),
            round_number_proximity: dec!(0.005),
            round_number_push_atr: dec!(0.1),
            zone_clearance_atr: dec!(0.5),
            room_factor: dec!(0.9),
            room_step: dec!(0.1),
            tp_multiples: [dec!(1.5), dec!(2.5), dec!(4.0)],
            zone_tp_pullback: dec!(0.05),
            zone_tp_max_r: dec!(10),
            tp1_min_r: dec!(0.5),
            zone_test_window_hours: 24,
            min_rr: MinRrConfig::default(),
        }
    }
}

/// 시그널 라이프사이클 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// 기본 부분 청산 비율
    pub split: PartialCloseSplit,
    /// 가격 확인 주기 (초)
    pub check_interval_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            split: PartialCloseSplit::default(),
            check_interval_secs: 60,
        }
    }
}

/// 배치 스캐너 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// 패턴 감지 타임프레임
    pub timeframe: Timeframe,
    /// 감지용 캔들 조회 수
    pub candle_limit: usize,
    /// 존 타임프레임별 캔들 조회 수
    pub zone_candle_limit: usize,
    /// 분당 요청 가중치 한도
    pub request_budget_per_minute: u32,
    /// 종목당 요청 가중치 (캔들 요청 4회)
    pub weight_per_instrument: u32,
    /// 존 테스트 추적 허용 오차 (가격 대비 비율)
    pub zone_tracking_tolerance: Decimal,
    /// 스캔 대상 종목
    pub symbols: Vec<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            timeframe: Timeframe::M15,
            candle_limit: 500,
            zone_candle_limit: 300,
            request_budget_per_minute: 1200,
            weight_per_instrument: 4,
            zone_tracking_tolerance: dec!(0.003),
            symbols: Vec::new(),
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> TraderResult<Self> {
        let builder = config::Config::builder()
            // 기본값으로 시작
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // 파일에서 로드
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("TRADER")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> TraderResult<Self> {
        Self::load("config/default.toml")
    }

    /// 불가능한 값 조합을 거부합니다.
    pub fn validate(&self) -> TraderResult<()> {
        self.lifecycle.split.validate()?;

        let min_rr = &self.risk.min_rr;
        if min_rr.floor > min_rr.cap {
            return Err(TraderError::Config(format!(
                "min R:R floor {} exceeds cap {}",
                min_rr.floor, min_rr.cap
            )));
        }

        let positive = [
            ("risk.veto_h1_atr", self.risk.veto_h1_atr),
            ("risk.veto_m15_atr", self.risk.veto_m15_atr),
            ("risk.room_factor", self.risk.room_factor),
            ("risk.room_step", self.risk.room_step),
            ("risk.zone_tp_max_r", self.risk.zone_tp_max_r),
            ("detector.zone_proximity", self.detector.zone_proximity),
            ("detector.pin_bar_wick_ratio", self.detector.pin_bar_wick_ratio),
            ("zones.cluster_tolerance", self.zones.cluster_tolerance),
        ];
        for (name, value) in positive {
            if value <= Decimal::ZERO {
                return Err(TraderError::Config(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        if self
            .risk
            .tp_multiples
            .windows(2)
            .any(|w| w[0] <= Decimal::ZERO || w[1] <= w[0])
        {
            return Err(TraderError::Config(
                "risk.tp_multiples must be positive and strictly increasing".to_string(),
            ));
        }

        if self.risk.low_volatility_ratio > self.risk.high_volatility_ratio {
            return Err(TraderError::Config(
                "risk.low_volatility_ratio exceeds high_volatility_ratio".to_string(),
            ));
        }

        if self.risk.swing_lookback == 0 || self.risk.atr_period == 0 || self.detector.atr_period == 0 {
            return Err(TraderError::Config(
                "lookback and ATR periods must be non-zero".to_string(),
            ));
        }

        if self.detector.ema_fast >= self.detector.ema_slow {
            return Err(TraderError::Config(format!(
                "detector.ema_fast ({}) must be shorter than ema_slow ({})",
                self.detector.ema_fast, self.detector.ema_slow
            )));
        }

        if self.detector.min_candles < self.detector.ema_slow {
            return Err(TraderError::Config(format!(
                "detector.min_candles ({}) must cover ema_slow ({})",
                self.detector.min_candles, self.detector.ema_slow
            )));
        }

        if self.zones.swing_strength == 0 {
            return Err(TraderError::Config(
                "zones.swing_strength must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
