//! tracing 기반 로깅 초기화.
//!
//! 스캔 루프와 시그널 모니터는 프로세스 하나에서 같은 구독자를 공유합니다.
//! 설정 파일의 `[logging]` 섹션이 기본값이고, `RUST_LOG`가 있으면 레벨
//! 필터는 그 값을 따릅니다.

use std::str::FromStr;

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::config::LoggingConfig;
use crate::error::{TraderError, TraderResult};

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 개발용 여러 줄 형식
    #[default]
    Pretty,
    /// 로그 수집기용 JSON (현재 span 필드 포함)
    Json,
    /// 한 줄 형식
    Compact,
}

impl FromStr for LogFormat {
    type Err = TraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(TraderError::Config(format!(
                "logging.format must be pretty, json or compact (got '{other}')"
            ))),
        }
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn output_layer(format: LogFormat, span_events: bool) -> BoxedLayer {
    let events = if span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let layer = fmt::layer().with_target(true).with_span_events(events);

    match format {
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Json => layer.json().with_current_span(true).boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}

/// 레벨 지시자 문자열을 필터로 변환합니다.
///
/// `RUST_LOG`는 여기서 보지 않습니다. 환경 변수 우선순위는 [`init_logging`]이 처리합니다.
pub fn level_filter(directives: &str) -> TraderResult<EnvFilter> {
    EnvFilter::try_new(directives)
        .map_err(|e| TraderError::Config(format!("logging.level '{directives}': {e}")))
}

/// `[logging]` 섹션으로 전역 구독자를 설치합니다.
///
/// 형식 문자열이 잘못되었거나 구독자가 이미 설치되어 있으면 `Config` 에러를 반환합니다.
///
/// ```no_run
/// use trader_core::{config::AppConfig, logging::init_logging};
///
/// let config = AppConfig::load_default().unwrap();
/// init_logging(&config.logging).unwrap();
/// ```
pub fn init_logging(section: &LoggingConfig) -> TraderResult<()> {
    let format: LogFormat = section.format.parse()?;
    let filter = match EnvFilter::try_from_default_env() {
        Ok(from_env) => from_env,
        Err(_) => level_filter(&section.level)?,
    };

    tracing_subscriber::registry()
        .with(output_layer(format, section.span_events))
        .with(filter)
        .try_init()
        .map_err(|e| TraderError::Config(format!("tracing subscriber: {e}")))?;

    tracing::debug!(?format, level = %section.level, "logging ready");
    Ok(())
}

/// `LOG_FORMAT` 환경 변수로 형식만 바꿔 기본 섹션으로 초기화합니다.
pub fn init_logging_from_env() -> TraderResult<()> {
    let mut section = LoggingConfig::default();
    if let Ok(format) = std::env::var("LOG_FORMAT") {
        section.format = format;
    }
    init_logging(&section)
}

/// 종목/시간 프레임/시그널 ID 필드가 붙은 info span을 만듭니다.
///
/// ```ignore
/// let span = scan_span!("signal_check", signal.symbol, signal.timeframe, signal.id);
/// ```
#[macro_export]
macro_rules! scan_span {
    ($name:expr, $symbol:expr) => {
        tracing::info_span!($name, symbol = %$symbol)
    };
    ($name:expr, $symbol:expr, $timeframe:expr) => {
        tracing::info_span!($name, symbol = %$symbol, timeframe = %$timeframe)
    };
    ($name:expr, $symbol:expr, $timeframe:expr, $signal_id:expr) => {
        tracing::info_span!(
            $name,
            symbol = %$symbol,
            timeframe = %$timeframe,
            signal_id = %$signal_id
        )
    };
}
