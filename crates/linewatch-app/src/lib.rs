//! # linewatch-app
//!
//! `linewatch` 바이너리의 구성 요소. CLI 인자 해석, 설정 오버라이드,
//! 어댑터 와이어링, 단발 명령, 상태 보고, 시그널 기반 종료.

pub mod cli;
pub mod commands;
pub mod lifecycle;
pub mod report;
pub mod wiring;
