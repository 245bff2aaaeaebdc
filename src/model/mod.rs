pub mod entities;
pub mod identifier;
pub mod validation;

pub use entities::{
    DockerImage, Entity, Lab, LabDockerImage, LabInstance, LabInstanceResult, NewDockerImage,
    NewLab, NewLabDockerImage, NewLabInstance, User,
};
pub use identifier::Identifier;
pub use validation::{is_dns_label, is_dns_subdomain, validate, Rule, ValidationError};
