//! The radio control-plane RPC client: an XML-RPC peer exposing the nine
//! setter methods the interpreter and rotor servo push values to. The
//! FFT/integration pipeline behind this RPC endpoint is out of scope; only
//! the call shape matters here.

use crate::error::SrtError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use xmlrpc::{Request, Value};

/// The radio's remote-control surface, as consumed by the servo and
/// interpreter tasks.
#[async_trait]
pub trait RadioRpc: Send + Sync {
    /// Sets the center frequency, Hz.
    async fn set_freq(&self, hz: f64) -> Result<(), SrtError>;
    /// Sets the sample rate, Hz.
    async fn set_samp_rate(&self, hz: f64) -> Result<(), SrtError>;
    /// Mirrors the measured azimuth, degrees.
    async fn set_motor_az(&self, deg: f64) -> Result<(), SrtError>;
    /// Mirrors the measured elevation, degrees.
    async fn set_motor_el(&self, deg: f64) -> Result<(), SrtError>;
    /// Sets the system temperature, K.
    async fn set_tsys(&self, k: f64) -> Result<(), SrtError>;
    /// Sets the calibration temperature, K.
    async fn set_tcal(&self, k: f64) -> Result<(), SrtError>;
    /// Sets the calibration reference power.
    async fn set_cal_pwr(&self, power: f64) -> Result<(), SrtError>;
    /// Sets the per-bin calibration gain values.
    async fn set_cal_values(&self, values: Vec<f64>) -> Result<(), SrtError>;
    /// Sets whether the radio pipeline should consider itself running.
    async fn set_is_running(&self, running: bool) -> Result<(), SrtError>;
}

/// A real XML-RPC client. `xmlrpc::Client` is synchronous, so every call is
/// pushed onto the blocking thread pool; an internal mutex serializes
/// concurrent callers against the single underlying client, matching the
/// "RPC calls must be serializable" requirement for a shared endpoint.
pub struct XmlRpcRadio {
    client: Arc<Mutex<xmlrpc::Client>>,
}

impl XmlRpcRadio {
    /// Builds a client targeting `url` (e.g. `http://localhost:5557/`).
    pub fn new(url: &str) -> Self {
        Self {
            client: Arc::new(Mutex::new(xmlrpc::Client::new(url))),
        }
    }

    async fn call(&self, method: &'static str, args: Vec<Value>) -> Result<(), SrtError> {
        let client = self.client.clone();
        tokio::task::spawn_blocking(move || {
            let guard = client.blocking_lock();
            let mut request = Request::new(method);
            for arg in &args {
                request = request.arg(arg.clone());
            }
            request.call(&*guard).map(|_| ())
        })
        .await
        .map_err(|e| SrtError::Rpc(format!("radio rpc task panicked: {e}")))?
        .map_err(|e| SrtError::Rpc(e.to_string()))
    }
}

#[async_trait]
impl RadioRpc for XmlRpcRadio {
    async fn set_freq(&self, hz: f64) -> Result<(), SrtError> {
        self.call("set_freq", vec![Value::from(hz)]).await
    }

    async fn set_samp_rate(&self, hz: f64) -> Result<(), SrtError> {
        self.call("set_samp_rate", vec![Value::from(hz)]).await
    }

    async fn set_motor_az(&self, deg: f64) -> Result<(), SrtError> {
        self.call("set_motor_az", vec![Value::from(deg)]).await
    }

    async fn set_motor_el(&self, deg: f64) -> Result<(), SrtError> {
        self.call("set_motor_el", vec![Value::from(deg)]).await
    }

    async fn set_tsys(&self, k: f64) -> Result<(), SrtError> {
        self.call("set_tsys", vec![Value::from(k)]).await
    }

    async fn set_tcal(&self, k: f64) -> Result<(), SrtError> {
        self.call("set_tcal", vec![Value::from(k)]).await
    }

    async fn set_cal_pwr(&self, power: f64) -> Result<(), SrtError> {
        self.call("set_cal_pwr", vec![Value::from(power)]).await
    }

    async fn set_cal_values(&self, values: Vec<f64>) -> Result<(), SrtError> {
        let array = Value::Array(values.into_iter().map(Value::from).collect());
        self.call("set_cal_values", vec![array]).await
    }

    async fn set_is_running(&self, running: bool) -> Result<(), SrtError> {
        self.call("set_is_running", vec![Value::from(running)])
            .await
    }
}

/// An in-memory stand-in for tests and for running without a radio peer
/// attached: records the last value pushed through each setter.
#[derive(Default)]
pub struct MockRadioRpc {
    pub freq_hz: Mutex<Option<f64>>,
    pub samp_rate_hz: Mutex<Option<f64>>,
    pub motor_az_deg: Mutex<Option<f64>>,
    pub motor_el_deg: Mutex<Option<f64>>,
    pub tsys_k: Mutex<Option<f64>>,
    pub tcal_k: Mutex<Option<f64>>,
    pub cal_pwr: Mutex<Option<f64>>,
    pub cal_values: Mutex<Option<Vec<f64>>>,
    pub is_running: Mutex<Option<bool>>,
}

#[async_trait]
impl RadioRpc for MockRadioRpc {
    async fn set_freq(&self, hz: f64) -> Result<(), SrtError> {
        *self.freq_hz.lock().await = Some(hz);
        Ok(())
    }

    async fn set_samp_rate(&self, hz: f64) -> Result<(), SrtError> {
        *self.samp_rate_hz.lock().await = Some(hz);
        Ok(())
    }

    async fn set_motor_az(&self, deg: f64) -> Result<(), SrtError> {
        *self.motor_az_deg.lock().await = Some(deg);
        Ok(())
    }

    async fn set_motor_el(&self, deg: f64) -> Result<(), SrtError> {
        *self.motor_el_deg.lock().await = Some(deg);
        Ok(())
    }

    async fn set_tsys(&self, k: f64) -> Result<(), SrtError> {
        *self.tsys_k.lock().await = Some(k);
        Ok(())
    }

    async fn set_tcal(&self, k: f64) -> Result<(), SrtError> {
        *self.tcal_k.lock().await = Some(k);
        Ok(())
    }

    async fn set_cal_pwr(&self, power: f64) -> Result<(), SrtError> {
        *self.cal_pwr.lock().await = Some(power);
        Ok(())
    }

    async fn set_cal_values(&self, values: Vec<f64>) -> Result<(), SrtError> {
        *self.cal_values.lock().await = Some(values);
        Ok(())
    }

    async fn set_is_running(&self, running: bool) -> Result<(), SrtError> {
        *self.is_running.lock().await = Some(running);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_radio_records_pushed_values() {
        let radio = MockRadioRpc::default();
        radio.set_freq(400_000_000.0).await.unwrap();
        radio.set_is_running(true).await.unwrap();
        assert_eq!(*radio.freq_hz.lock().await, Some(400_000_000.0));
        assert_eq!(*radio.is_running.lock().await, Some(true));
    }
}
