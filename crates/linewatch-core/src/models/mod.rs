//! LINEWATCH 도메인 모델.
//!
//! 서버-클라이언트 간 공유하는 데이터 구조체를 정의한다.
//! 모든 모델은 `serde` Serialize/Deserialize를 구현한다.

pub mod feed;
pub mod machine;
pub mod production;
