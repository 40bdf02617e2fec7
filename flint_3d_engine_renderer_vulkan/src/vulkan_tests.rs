//! Unit tests for vulkan.rs
//!
//! Queue family selection and messenger setup. Everything needing a GPU
//! lives in tests/vulkan_graphics_device_tests.rs.

use super::*;

fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
    vk::QueueFamilyProperties {
        queue_flags: flags,
        queue_count: 1,
        ..Default::default()
    }
}

// ============================================================================
// Queue families
// ============================================================================

#[test]
fn test_single_family_serves_every_queue() {
    let families = [family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER)];

    let selected = select_queue_families(&families, |_| true).unwrap();
    assert_eq!(selected, QueueFamilies { graphics: 0, compute: 0, transfer: 0 });
}

#[test]
fn test_dedicated_families_are_preferred() {
    let families = [
        family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER),
        family(vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER),
        family(vk::QueueFlags::TRANSFER),
    ];

    let selected = select_queue_families(&families, |_| true).unwrap();
    assert_eq!(selected, QueueFamilies { graphics: 0, compute: 1, transfer: 2 });
}

#[test]
fn test_graphics_family_must_present() {
    let families = [
        family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE),
        family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE),
    ];

    let selected = select_queue_families(&families, |i| i == 1).unwrap();
    assert_eq!(selected.graphics, 1);
    assert_eq!(selected.compute, 1);
}

#[test]
fn test_no_presenting_graphics_family() {
    let families = [family(vk::QueueFlags::GRAPHICS), family(vk::QueueFlags::COMPUTE)];

    assert!(select_queue_families(&families, |i| i == 1).is_none());
    assert!(select_queue_families(&[], |_| true).is_none());
}

// ============================================================================
// Debug messenger
// ============================================================================

#[test]
fn test_messenger_severity_flags() {
    assert_eq!(messenger_severity(DebugSeverity::ErrorsOnly), vk::DebugUtilsMessageSeverityFlagsEXT::ERROR);

    let errors_and_warnings = messenger_severity(DebugSeverity::ErrorsAndWarnings);
    assert!(errors_and_warnings.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING));
    assert!(!errors_and_warnings.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO));

    assert!(messenger_severity(DebugSeverity::All).contains(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE));
}
