pub mod resource_floatingip_associate_v2;

pub use resource_floatingip_associate_v2::FloatingIpAssociateV2Resource;
