#![allow(dead_code)]

pub mod labels;
pub mod scripts;
pub mod config_home;
