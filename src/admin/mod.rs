pub mod availability_registry;
pub mod booking_assembler;
