use serde::Serialize;
use wasm_bindgen::prelude::*;

use canopy_core::load::{read_csv_str, read_keyed_csv};
use canopy_core::patterns::{load_ndvi_patterns, species_line};
use canopy_core::taxonomy::{
    composition, composition_for_plot, composition_variability, plots_with_type, species_composition, MAJOR_SPECIES,
};
use canopy_core::{
    plots_from_table, trees_from_table, DatasetConfig, FeatureStore, PlotCode, Statistic, TreeType, ViewParams,
};

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn plot_code(v: f64) -> Result<PlotCode, JsValue> {
    PlotCode::from_f64(v).ok_or_else(|| JsValue::from_str(&format!("Invalid plot code: {v}")))
}

// Plain objects rather than JS `Map`s, so the chart library can read keys.
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value.serialize(&serde_wasm_bindgen::Serializer::json_compatible()).map_err(js_err)
}

/// Browser-side handle over the loaded tables.
///
/// The page fetches the CSV files itself and hands their text in; every
/// chart request then returns plain JS objects ready for the chart library.
#[wasm_bindgen]
pub struct Explorer {
    config: DatasetConfig,
    store: FeatureStore,
}

#[wasm_bindgen]
impl Explorer {
    /// `config_json` may be empty for the default file layout.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<Explorer, JsValue> {
        let config = if config_json.trim().is_empty() {
            DatasetConfig::default()
        } else {
            DatasetConfig::from_json_str(config_json).map_err(|e| JsValue::from_str(&format!("Invalid config: {e}")))?
        };
        Ok(Explorer { config, store: FeatureStore::new() })
    }

    /// File names the page should fetch, as `{ features: [{year, statistic, file}], trees, plots, ndviPatterns }`.
    #[wasm_bindgen(js_name = fileManifest)]
    pub fn file_manifest(&self) -> Result<JsValue, JsValue> {
        let features: Vec<serde_json::Value> = self
            .config
            .years
            .iter()
            .flat_map(|&year| {
                [Statistic::Mean, Statistic::StdDev].map(|statistic| {
                    serde_json::json!({
                        "year": year,
                        "statistic": statistic,
                        "file": self.config.features_file(year, statistic),
                    })
                })
            })
            .collect();
        to_js(&serde_json::json!({
            "features": features,
            "trees": self.config.trees_file,
            "plots": self.config.plots_file,
            "ndviPatterns": self.config.ndvi_patterns_file,
        }))
    }

    /// `statistic` is `"mean"` or `"stdDev"`.
    #[wasm_bindgen(js_name = loadFeatures)]
    pub fn load_features(&mut self, year: u16, statistic: &str, csv: &str) -> Result<usize, JsValue> {
        let statistic: Statistic = statistic.parse().map_err(js_err)?;
        let name = self.config.features_file(year, statistic);
        let table = read_keyed_csv(csv, &name).map_err(js_err)?;
        let rows = table.len();
        self.store.insert_features(year, statistic, table);
        Ok(rows)
    }

    #[wasm_bindgen(js_name = loadTrees)]
    pub fn load_trees(&mut self, csv: &str) -> Result<usize, JsValue> {
        let trees = trees_from_table(&read_csv_str(csv).map_err(js_err)?);
        let n = trees.len();
        self.store.set_trees(trees);
        Ok(n)
    }

    #[wasm_bindgen(js_name = loadPlots)]
    pub fn load_plots(&mut self, csv: &str) -> Result<usize, JsValue> {
        let plots = plots_from_table(&read_csv_str(csv).map_err(js_err)?);
        let n = plots.len();
        self.store.set_plots(plots);
        Ok(n)
    }

    #[wasm_bindgen(js_name = loadedYears)]
    pub fn loaded_years(&self) -> Vec<u16> {
        self.store.years()
    }

    /// Build one chart. `params` is a `ViewParams` object, e.g.
    /// `{ year: "all", view: "ndvi", statistic: "mean", plot: null, stratify: "none" }`.
    pub fn view(&self, params: JsValue) -> Result<JsValue, JsValue> {
        let params: ViewParams = serde_wasm_bindgen::from_value(params)
            .map_err(|e| JsValue::from_str(&format!("Invalid view params: {e}")))?;
        let output = self.store.build_view(&params).map_err(js_err)?;
        to_js(&output)
    }

    /// Composition of one plot, or of every loaded tree when `plot` is absent.
    /// Returns `null` when there are no trees.
    pub fn composition(&self, plot: Option<f64>) -> Result<JsValue, JsValue> {
        let result = match plot {
            Some(v) => composition_for_plot(self.store.trees(), plot_code(v)?),
            None => composition(self.store.trees()),
        };
        to_js(&result)
    }

    /// Species breakdown of one plot, most numerous first; `null` for an empty plot.
    #[wasm_bindgen(js_name = speciesComposition)]
    pub fn species_composition(&self, plot: f64) -> Result<JsValue, JsValue> {
        to_js(&species_composition(self.store.trees(), plot_code(plot)?))
    }

    /// Plot codes holding at least one tree of `tree_type` (`"evergreen"`, `"deciduous"` or `"unknown"`).
    #[wasm_bindgen(js_name = plotsWithType)]
    pub fn plots_with_type(&self, tree_type: &str) -> Result<JsValue, JsValue> {
        let t: TreeType = tree_type.parse().map_err(js_err)?;
        to_js(&plots_with_type(self.store.trees(), t))
    }

    #[wasm_bindgen(js_name = compositionVariability)]
    pub fn composition_variability(&self) -> Result<JsValue, JsValue> {
        to_js(&composition_variability(self.store.trees()))
    }

    /// Parse `preprocessed_ndvi_patterns.json` and pair it with legend entries
    /// for the charted species.
    #[wasm_bindgen(js_name = ndviPatterns)]
    pub fn ndvi_patterns(&self, json: &str) -> Result<JsValue, JsValue> {
        let rows = load_ndvi_patterns(json).map_err(js_err)?;
        let lines: Vec<_> = MAJOR_SPECIES.iter().map(|s| species_line(s)).collect();
        to_js(&serde_json::json!({ "rows": rows, "lines": lines }))
    }
}
