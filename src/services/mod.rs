pub mod backtest;
pub mod conditions;
pub mod lab_data;
pub mod open_meteo;
pub mod prediction;
pub mod risk;
pub mod toxin;
pub mod variation;
