//! Junos-specific operational RPCs.
//!
//! Operations in this module require the server to advertise the
//! [`JunosXmlManagementProtocol`][crate::capabilities::Capability::JunosXmlManagementProtocol]
//! capability.

pub mod get_route_information;
#[doc(inline)]
pub use self::get_route_information::GetRouteInformation;
