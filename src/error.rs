/// [Result] alias for return types of the crate API
pub type Result<T> = std::result::Result<T, Error>;

/// Error enum type
#[derive(Debug)]
pub enum Error {
    /// Scanning did not find any Crazyflie.
    NoVehicleFound,
    /// Scanning found more than one Crazyflie. The Vec contains the URIs found.
    MultipleVehiclesFound(Vec<String>),
    /// The position estimator did not converge before the configured deadline.
    EstimatorTimeout,
    /// The telemetry stream closed before the expected condition was observed.
    TelemetryClosed,
    /// The vehicle is currently disconnected.
    Disconnected,
    /// Error reported by the flight-control SDK. The String contains the reason.
    Sdk(String),
    /// Mission configuration is invalid. The String contains the reason.
    InvalidConfig(String),
    /// Filesystem error while reading or writing an artifact.
    Io(std::io::Error),
    /// Configuration file could not be parsed.
    Json(serde_json::Error),
    /// Flight log array could not be read or written. The String contains the reason.
    Npy(String),
    /// Rendering a figure failed. The String contains the reason.
    Plot(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NoVehicleFound => write!(f, "no Crazyflie found"),
            Error::MultipleVehiclesFound(uris) => {
                write!(f, "expected exactly one Crazyflie, found {}: {}", uris.len(), uris.join(", "))
            }
            Error::EstimatorTimeout => write!(f, "position estimator did not converge in time"),
            Error::TelemetryClosed => write!(f, "telemetry stream closed"),
            Error::Disconnected => write!(f, "vehicle disconnected"),
            Error::Sdk(reason) => write!(f, "flight-control SDK error: {}", reason),
            Error::InvalidConfig(reason) => write!(f, "invalid configuration: {}", reason),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Json(e) => write!(f, "configuration parse error: {}", e),
            Error::Npy(reason) => write!(f, "flight log array error: {}", reason),
            Error::Plot(reason) => write!(f, "plot error: {}", reason),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(error)
    }
}

impl From<ndarray_npy::WriteNpyError> for Error {
    fn from(error: ndarray_npy::WriteNpyError) -> Self {
        Self::Npy(format!("{}", error))
    }
}

impl From<ndarray_npy::ReadNpyError> for Error {
    fn from(error: ndarray_npy::ReadNpyError) -> Self {
        Self::Npy(format!("{}", error))
    }
}

impl From<flume::RecvError> for Error {
    fn from(_: flume::RecvError) -> Self {
        self::Error::TelemetryClosed
    }
}

#[cfg(feature = "radio")]
impl From<crazyflie_lib::Error> for Error {
    fn from(error: crazyflie_lib::Error) -> Self {
        match error {
            crazyflie_lib::Error::Disconnected => Self::Disconnected,
            e => Self::Sdk(format!("{:?}", e)),
        }
    }
}

#[cfg(feature = "radio")]
impl From<crazyflie_link::Error> for Error {
    fn from(error: crazyflie_link::Error) -> Self {
        Self::Sdk(format!("{:?}", error))
    }
}
