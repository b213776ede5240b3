use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// Number of classes the classification model distinguishes.
pub const CLASS_COUNT: usize = 10;

/// The disease classes, in model output order. The model's score vector is
/// indexed by this declaration order, so variants must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr, EnumIter, EnumString)]
pub enum DiseaseClass {
    #[strum(serialize = "Tomato_Bacterial_spot")]
    BacterialSpot,
    #[strum(serialize = "Tomato_Early_blight")]
    EarlyBlight,
    #[strum(serialize = "Tomato_Late_blight")]
    LateBlight,
    #[strum(serialize = "Tomato_Leaf_Mold")]
    LeafMold,
    #[strum(serialize = "Tomato_Septoria_leaf_spot")]
    SeptoriaLeafSpot,
    #[strum(serialize = "Tomato_Spider_mites_Two_spotted_spider_mite")]
    SpiderMites,
    #[strum(serialize = "Tomato_Target_Spot")]
    TargetSpot,
    #[strum(serialize = "Tomato_Tomato_Yellow_Leaf_Curl_Virus")]
    YellowLeafCurlVirus,
    #[strum(serialize = "Tomato_Tomato_mosaic_virus")]
    MosaicVirus,
    #[strum(serialize = "Tomato_healthy")]
    Healthy,
}

impl DiseaseClass {
    /// Class names in score-vector order.
    pub fn names() -> Vec<&'static str> {
        Self::iter().map(<&'static str>::from).collect()
    }
}

/// Cure and prevention steps for one disease class.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AdviceEntry {
    pub cure: Vec<String>,
    pub prevention: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TopPrediction {
    pub class_name: String,
    pub confidence: f32,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PredictionResponse {
    pub request_id: String,
    pub predicted_class: String,
    pub confidence: f32,
    pub top_predictions: Vec<TopPrediction>,
    pub scores: Vec<f32>,
    pub advice: AdviceEntry,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub model_error: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FunFactResponse {
    pub fact: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ExpertHelpRequest {
    pub name: String,
    pub email: String,
    pub message: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ExpertHelpResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn class_table_has_ten_entries_in_model_order() {
        let names = DiseaseClass::names();
        assert_eq!(names.len(), CLASS_COUNT);
        assert_eq!(names[0], "Tomato_Bacterial_spot");
        assert_eq!(names[9], "Tomato_healthy");
    }

    #[test]
    fn class_names_parse_back_to_variants() {
        for name in DiseaseClass::names() {
            let class = DiseaseClass::from_str(name).unwrap();
            assert_eq!(<&'static str>::from(class), name);
        }
    }

    #[test]
    fn display_matches_static_name() {
        assert_eq!(DiseaseClass::Healthy.to_string(), "Tomato_healthy");
        assert_eq!(
            DiseaseClass::SpiderMites.to_string(),
            "Tomato_Spider_mites_Two_spotted_spider_mite"
        );
    }
}
