//! Request and response DTOs for the REST surface.

pub mod sos_dto;

pub use sos_dto::{
    CreateSosRequest, LocationDto, NearbyQuery, NearbySosDto, SosDto, SosListResponse,
    UpdateStatusRequest,
};
