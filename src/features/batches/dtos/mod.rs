mod batch_dto;

pub use batch_dto::{
    AclDto, AttributeDto, BatchCreatedDto, BatchDetailsDto, BatchFileDto, CreateBatchDto,
};
