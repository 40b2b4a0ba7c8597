/// Gantry Web - WASM bindings for a browser-hosted simulator
///
/// The page owns rendering and its frame callback; this crate owns the machine
/// state, limits, kinematics and the auto-scan loop. Matrices cross the
/// boundary as 16 column-major floats.
use gantry_core::{Axis, SimConfig, SimError, Simulator};
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
fn log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}

#[cfg(not(target_arch = "wasm32"))]
fn log(_message: &str) {}

fn parse_axis(name: &str) -> Result<Axis, JsValue> {
    name.parse::<Axis>().map_err(|e| JsValue::from_str(&e))
}

fn to_js(err: SimError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen]
pub struct WebSimulator {
    sim: Simulator,
}

#[wasm_bindgen]
impl WebSimulator {
    /// Simulator with the default limits, tool length and scan path
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<WebSimulator, JsValue> {
        Self::from_config(&SimConfig::default())
    }

    /// Simulator configured from a TOML document
    #[wasm_bindgen(js_name = fromToml)]
    pub fn from_toml(config: &str) -> Result<WebSimulator, JsValue> {
        let config =
            SimConfig::from_toml_str(config).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Self::from_config(&config)
    }

    fn from_config(config: &SimConfig) -> Result<WebSimulator, JsValue> {
        let sim = Simulator::new(config).map_err(|e| JsValue::from_str(&e.to_string()))?;
        log("gantry simulator ready");
        Ok(WebSimulator { sim })
    }

    /// Manual motor-space write. Returns the clamped value stored.
    #[wasm_bindgen(js_name = setAxis)]
    pub fn set_axis(&mut self, axis: &str, value: f64) -> Result<f64, JsValue> {
        Ok(self.sim.set_axis(parse_axis(axis)?, value))
    }

    /// Manual write from an input field. Returns `undefined` and leaves the
    /// state alone for non-numeric text.
    #[wasm_bindgen(js_name = setAxisText)]
    pub fn set_axis_text(&mut self, axis: &str, text: &str) -> Result<Option<f64>, JsValue> {
        Ok(self.sim.set_axis_text(parse_axis(axis)?, text))
    }

    /// TCP-space write on X/Y/Z. Returns the TCP value actually reached,
    /// which differs from `target` when the motor hit a limit.
    #[wasm_bindgen(js_name = setTcp)]
    pub fn set_tcp(&mut self, axis: &str, target: f64) -> Result<f64, JsValue> {
        let solution = self.sim.set_tcp(parse_axis(axis)?, target).map_err(to_js)?;
        if solution.clamped {
            log(&format!(
                "TCP {} limited: requested {:.2}, reached {:.2}",
                solution.axis, solution.requested, solution.realized
            ));
        }
        Ok(solution.realized)
    }

    pub fn home(&mut self) {
        self.sim.home();
    }

    #[wasm_bindgen(js_name = startScan)]
    pub fn start_scan(&mut self, now_ms: f64) {
        self.sim.start_scan(now_ms / 1000.0);
        log("auto-scan started");
    }

    #[wasm_bindgen(js_name = stopScan)]
    pub fn stop_scan(&mut self) {
        self.sim.stop_scan();
    }

    #[wasm_bindgen(js_name = isScanning)]
    pub fn is_scanning(&self) -> bool {
        self.sim.is_scanning()
    }

    /// Frame callback hook. Returns whether the scan moved the machine.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        self.sim.tick(now_ms / 1000.0)
    }

    /// `[x, y, z, a, b]`
    pub fn state(&self) -> Vec<f64> {
        let s = self.sim.state();
        vec![s.x, s.y, s.z, s.a, s.b]
    }

    /// Home-relative TCP pose, column-major
    pub fn pose(&self) -> Vec<f64> {
        self.sim.pose().to_column_major().to_vec()
    }

    /// Pose as shown in the readout panel: noise removed, two decimals
    #[wasm_bindgen(js_name = displayPose)]
    pub fn display_pose(&self) -> Vec<f64> {
        self.sim.pose().cleaned().to_column_major().to_vec()
    }

    /// TCP displacement caused by gimbal rotation, `[x, y, z]`
    pub fn offset(&self) -> Vec<f64> {
        self.sim.tool_offset().as_slice().to_vec()
    }

    /// Absolute TCP position in machine space, `[x, y, z]`
    pub fn tcp(&self) -> Vec<f64> {
        self.sim.tcp().coords.as_slice().to_vec()
    }

    /// Readout panel text
    pub fn readout(&self) -> String {
        self.sim.readout().to_string()
    }
}
