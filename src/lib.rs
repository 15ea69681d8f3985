#![cfg_attr(not(test), no_std)]

//! # pico-badge-enviro
//! ## Firmware for a Badger 2040 name badge and a Pico W Enviro+ station
//!
//! Features:
//! - Badge record stored as plain text, defaults written on first boot
//! - Badge layouts that shrink or truncate every line to fit the panel
//! - UC8151 e-paper and LTR-559 light sensor drivers
//! - Temperature, humidity, pressure and gas sampling with self-heating correction
//! - Barometer and comfort descriptions, running gas range with alert
//! - Dashboard and network status screens
//! - Periodic MQTT publishing of every reading

#[macro_use]
mod fmt;

pub mod badge;
pub mod canvas;
pub mod climate;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod font;
pub mod gas;
pub mod layout;
pub mod ltr559;
pub mod mqtt;
pub mod publish;
pub mod sensors;
pub mod station;
pub mod text_fit;
pub mod timer;
pub mod uc8151;
