//! Physical device selection
//!
//! Candidates are immutable snapshots of what a physical device reported
//! during enumeration. Selection filters out devices that cannot drive a
//! swapchain on the target surface and scores the rest.
//!
//! Nothing in this module talks to the driver, so every rule here can be
//! exercised with hand-built candidates.

use ash::extensions::khr::Swapchain as SwapchainLoader;
use ash::vk;
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::CStr;
use std::fmt;
use thiserror::Error;

/// Score bonus for a discrete GPU
pub const DISCRETE_GPU_BONUS: u32 = 1000;

/// Device extensions every selected device must support
pub fn required_device_extensions() -> [&'static CStr; 1] {
    [SwapchainLoader::name()]
}

/// Kind of work a queue family can accept
///
/// The ordering follows the Vulkan flag bit values and is the order in which
/// families are probed for presentation support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueueCapability {
    /// `VK_QUEUE_GRAPHICS_BIT`
    Graphics,
    /// `VK_QUEUE_COMPUTE_BIT`
    Compute,
    /// `VK_QUEUE_TRANSFER_BIT`
    Transfer,
    /// `VK_QUEUE_SPARSE_BINDING_BIT`
    SparseBinding,
    /// `VK_QUEUE_PROTECTED_BIT`
    Protected,
}

impl QueueCapability {
    /// Every capability, in probing order
    pub const ALL: [Self; 5] = [
        Self::Graphics,
        Self::Compute,
        Self::Transfer,
        Self::SparseBinding,
        Self::Protected,
    ];

    /// Matching Vulkan queue flag
    pub fn flag(self) -> vk::QueueFlags {
        match self {
            Self::Graphics => vk::QueueFlags::GRAPHICS,
            Self::Compute => vk::QueueFlags::COMPUTE,
            Self::Transfer => vk::QueueFlags::TRANSFER,
            Self::SparseBinding => vk::QueueFlags::SPARSE_BINDING,
            Self::Protected => vk::QueueFlags::PROTECTED,
        }
    }
}

/// Map each capability to the first queue family that advertises it
pub fn queue_family_indices(families: &[vk::QueueFamilyProperties]) -> BTreeMap<QueueCapability, u32> {
    let mut indices = BTreeMap::new();

    for (index, family) in families.iter().enumerate() {
        for capability in QueueCapability::ALL {
            if family.queue_flags.contains(capability.flag()) {
                indices.entry(capability).or_insert(index as u32);
            }
        }
    }

    indices
}

/// Find a queue family that can present to the target surface
///
/// Families are probed in capability order. `supports_present` answers the
/// per-family surface query; its errors are returned unchanged. `Ok(None)`
/// means no probed family can present.
pub fn find_present_family<E>(
    indices: &BTreeMap<QueueCapability, u32>,
    mut supports_present: impl FnMut(u32) -> Result<bool, E>,
) -> Result<Option<u32>, E> {
    let mut probed = BTreeSet::new();

    for &family in indices.values() {
        if !probed.insert(family) {
            continue;
        }
        if supports_present(family)? {
            return Ok(Some(family));
        }
    }

    Ok(None)
}

/// Why a candidate cannot be used
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Ineligibility {
    /// No queue family accepts graphics work
    #[error("no graphics queue family")]
    NoGraphicsQueue,

    /// No queue family can present to the surface
    #[error("no queue family can present to the surface")]
    NoPresentQueue,

    /// A required device extension is not advertised
    #[error("missing device extension {0}")]
    MissingExtension(String),
}

/// Device selection errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// Enumeration returned no devices at all
    #[error("No physical device present")]
    NoPhysicalDevice,

    /// Devices exist but none passed the eligibility checks
    #[error("None of the {candidates} physical device(s) is suitable")]
    NoSuitableDevice {
        /// Number of devices that were considered
        candidates: usize,
    },
}

/// Snapshot of a physical device taken during enumeration
#[derive(Debug, Clone)]
pub struct PhysicalDeviceCandidate {
    handle: vk::PhysicalDevice,
    name: String,
    vendor_id: u32,
    device_id: u32,
    api_version: u32,
    device_type: vk::PhysicalDeviceType,
    max_image_dimension_2d: u32,
    features: vk::PhysicalDeviceFeatures,
    queue_families: BTreeMap<QueueCapability, u32>,
    present_family: Option<u32>,
    extensions: BTreeSet<String>,
}

impl PhysicalDeviceCandidate {
    /// Start building a candidate for the given device handle
    pub fn builder(handle: vk::PhysicalDevice) -> CandidateBuilder {
        CandidateBuilder::new(handle)
    }

    /// Vulkan physical device handle
    pub fn handle(&self) -> vk::PhysicalDevice {
        self.handle
    }

    /// Device name reported by the driver
    pub fn name(&self) -> &str {
        &self.name
    }

    /// PCI vendor id
    pub fn vendor_id(&self) -> u32 {
        self.vendor_id
    }

    /// Vendor specific device id
    pub fn device_id(&self) -> u32 {
        self.device_id
    }

    /// Highest Vulkan version supported by the device
    pub fn api_version(&self) -> u32 {
        self.api_version
    }

    /// Discrete, integrated, virtual, CPU or other
    pub fn device_type(&self) -> vk::PhysicalDeviceType {
        self.device_type
    }

    /// `maxImageDimension2D` limit
    pub fn max_image_dimension_2d(&self) -> u32 {
        self.max_image_dimension_2d
    }

    /// Supported optional features
    pub fn features(&self) -> &vk::PhysicalDeviceFeatures {
        &self.features
    }

    /// First queue family index for each capability the device has
    pub fn queue_families(&self) -> &BTreeMap<QueueCapability, u32> {
        &self.queue_families
    }

    /// First queue family index with the given capability
    pub fn queue_family(&self, capability: QueueCapability) -> Option<u32> {
        self.queue_families.get(&capability).copied()
    }

    /// Queue family that can present to the target surface
    pub fn present_family(&self) -> Option<u32> {
        self.present_family
    }

    /// Supported device extension names
    pub fn extensions(&self) -> &BTreeSet<String> {
        &self.extensions
    }

    /// Whether the device advertises the named extension
    pub fn supports_extension(&self, name: &CStr) -> bool {
        name.to_str().map_or(false, |name| self.extensions.contains(name))
    }

    /// First reason this candidate cannot be used, if any
    pub fn ineligibility(&self) -> Option<Ineligibility> {
        if self.queue_family(QueueCapability::Graphics).is_none() {
            return Some(Ineligibility::NoGraphicsQueue);
        }
        if self.present_family.is_none() {
            return Some(Ineligibility::NoPresentQueue);
        }
        required_device_extensions()
            .into_iter()
            .find(|extension| !self.supports_extension(extension))
            .map(|extension| Ineligibility::MissingExtension(extension.to_string_lossy().into_owned()))
    }

    /// Whether the candidate can be used for presentation
    pub fn is_eligible(&self) -> bool {
        self.ineligibility().is_none()
    }

    /// Preference score; higher is better
    ///
    /// Meaningful only for eligible candidates.
    pub fn score(&self) -> u32 {
        let bonus = if self.device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
            DISCRETE_GPU_BONUS
        } else {
            0
        };
        bonus.saturating_add(self.max_image_dimension_2d)
    }
}

impl fmt::Display for PhysicalDeviceCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (vulkan {}.{}.{} vendorId:deviceId {}:{} type {})",
            self.name,
            vk::api_version_major(self.api_version),
            vk::api_version_minor(self.api_version),
            vk::api_version_patch(self.api_version),
            self.vendor_id,
            self.device_id,
            device_type_label(self.device_type),
        )
    }
}

/// Short human readable name for a device type
pub fn device_type_label(device_type: vk::PhysicalDeviceType) -> &'static str {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => "discrete",
        vk::PhysicalDeviceType::INTEGRATED_GPU => "integrated",
        vk::PhysicalDeviceType::VIRTUAL_GPU => "virtual",
        vk::PhysicalDeviceType::CPU => "cpu",
        _ => "other",
    }
}

/// Builder producing a fully populated [`PhysicalDeviceCandidate`]
#[derive(Debug, Clone)]
pub struct CandidateBuilder {
    candidate: PhysicalDeviceCandidate,
}

impl CandidateBuilder {
    fn new(handle: vk::PhysicalDevice) -> Self {
        Self {
            candidate: PhysicalDeviceCandidate {
                handle,
                name: String::new(),
                vendor_id: 0,
                device_id: 0,
                api_version: vk::API_VERSION_1_0,
                device_type: vk::PhysicalDeviceType::OTHER,
                max_image_dimension_2d: 0,
                features: vk::PhysicalDeviceFeatures::default(),
                queue_families: BTreeMap::new(),
                present_family: None,
                extensions: BTreeSet::new(),
            },
        }
    }

    /// Copy name, ids, version, type and limits from driver properties
    pub fn properties(self, properties: &vk::PhysicalDeviceProperties) -> Self {
        // SAFETY: the driver fills device_name with a NUL terminated string
        let name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned();

        self.name(name)
            .ids(properties.vendor_id, properties.device_id)
            .api_version(properties.api_version)
            .device_type(properties.device_type)
            .max_image_dimension_2d(properties.limits.max_image_dimension2_d)
    }

    /// Set the device name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.candidate.name = name.into();
        self
    }

    /// Set vendor and device ids
    pub fn ids(mut self, vendor_id: u32, device_id: u32) -> Self {
        self.candidate.vendor_id = vendor_id;
        self.candidate.device_id = device_id;
        self
    }

    /// Set the supported API version
    pub fn api_version(mut self, api_version: u32) -> Self {
        self.candidate.api_version = api_version;
        self
    }

    /// Set the device type
    pub fn device_type(mut self, device_type: vk::PhysicalDeviceType) -> Self {
        self.candidate.device_type = device_type;
        self
    }

    /// Set the `maxImageDimension2D` limit
    pub fn max_image_dimension_2d(mut self, limit: u32) -> Self {
        self.candidate.max_image_dimension_2d = limit;
        self
    }

    /// Set supported features
    pub fn features(mut self, features: vk::PhysicalDeviceFeatures) -> Self {
        self.candidate.features = features;
        self
    }

    /// Record one capability's queue family
    pub fn queue_family(mut self, capability: QueueCapability, index: u32) -> Self {
        self.candidate.queue_families.insert(capability, index);
        self
    }

    /// Replace the whole capability map
    pub fn queue_families(mut self, families: BTreeMap<QueueCapability, u32>) -> Self {
        self.candidate.queue_families = families;
        self
    }

    /// Set the presentation queue family
    pub fn present_family(mut self, index: Option<u32>) -> Self {
        self.candidate.present_family = index;
        self
    }

    /// Add one supported extension
    pub fn extension(mut self, name: impl Into<String>) -> Self {
        self.candidate.extensions.insert(name.into());
        self
    }

    /// Add supported extensions
    pub fn extensions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidate.extensions.extend(names.into_iter().map(Into::into));
        self
    }

    /// Finish the candidate
    pub fn build(self) -> PhysicalDeviceCandidate {
        self.candidate
    }
}

/// Index of the best eligible candidate
///
/// Ties go to the earliest candidate.
pub fn select_best_index(candidates: &[PhysicalDeviceCandidate]) -> Result<usize, SelectionError> {
    if candidates.is_empty() {
        return Err(SelectionError::NoPhysicalDevice);
    }

    let mut best: Option<(usize, u32)> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        if let Some(reason) = candidate.ineligibility() {
            log::debug!("Skipping {}: {}", candidate.name(), reason);
            continue;
        }

        let score = candidate.score();
        log::debug!("{} scored {}", candidate.name(), score);

        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((index, score));
        }
    }

    best.map(|(index, _)| index).ok_or(SelectionError::NoSuitableDevice {
        candidates: candidates.len(),
    })
}

/// Pick the best eligible candidate, consuming the list
pub fn select_device(
    mut candidates: Vec<PhysicalDeviceCandidate>,
) -> Result<PhysicalDeviceCandidate, SelectionError> {
    let index = select_best_index(&candidates)?;
    Ok(candidates.swap_remove(index))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SWAPCHAIN: &str = "VK_KHR_swapchain";

    fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: 1,
            ..Default::default()
        }
    }

    fn eligible(name: &str, device_type: vk::PhysicalDeviceType, limit: u32) -> PhysicalDeviceCandidate {
        PhysicalDeviceCandidate::builder(vk::PhysicalDevice::null())
            .name(name)
            .device_type(device_type)
            .max_image_dimension_2d(limit)
            .queue_family(QueueCapability::Graphics, 0)
            .present_family(Some(0))
            .extension(SWAPCHAIN)
            .build()
    }

    fn selected_name(candidates: Vec<PhysicalDeviceCandidate>) -> String {
        select_device(candidates).unwrap().name().to_string()
    }

    #[test]
    fn test_queue_family_indices_keep_first_match() {
        let families = [
            family(vk::QueueFlags::TRANSFER),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::SPARSE_BINDING),
            family(vk::QueueFlags::COMPUTE),
        ];

        let indices = queue_family_indices(&families);

        assert_eq!(indices.get(&QueueCapability::Transfer), Some(&0));
        assert_eq!(indices.get(&QueueCapability::Graphics), Some(&1));
        assert_eq!(indices.get(&QueueCapability::Compute), Some(&1));
        assert_eq!(indices.get(&QueueCapability::SparseBinding), Some(&2));
        assert_eq!(indices.get(&QueueCapability::Protected), None);
    }

    #[test]
    fn test_queue_family_indices_empty() {
        assert!(queue_family_indices(&[]).is_empty());
        assert!(queue_family_indices(&[family(vk::QueueFlags::empty())]).is_empty());
    }

    #[test]
    fn test_present_family_follows_capability_order() {
        let indices = BTreeMap::from([
            (QueueCapability::Graphics, 2),
            (QueueCapability::Compute, 1),
            (QueueCapability::Transfer, 0),
        ]);
        let mut probed = Vec::new();

        let found = find_present_family(&indices, |family| {
            probed.push(family);
            Ok::<_, ()>(family != 2)
        });

        assert_eq!(found, Ok(Some(1)));
        assert_eq!(probed, vec![2, 1]);
    }

    #[test]
    fn test_present_family_probes_each_family_once() {
        let indices = BTreeMap::from([(QueueCapability::Graphics, 0), (QueueCapability::Compute, 0)]);
        let mut probes = 0;

        let found = find_present_family(&indices, |_| {
            probes += 1;
            Ok::<_, ()>(false)
        });

        assert_eq!(found, Ok(None));
        assert_eq!(probes, 1);
    }

    #[test]
    fn test_present_family_propagates_query_errors() {
        let indices = BTreeMap::from([(QueueCapability::Graphics, 0), (QueueCapability::Transfer, 1)]);

        let found = find_present_family(&indices, |_| Err(vk::Result::ERROR_SURFACE_LOST_KHR));

        assert_eq!(found, Err(vk::Result::ERROR_SURFACE_LOST_KHR));
    }

    #[test]
    fn test_empty_list_is_no_physical_device() {
        assert_eq!(select_best_index(&[]), Err(SelectionError::NoPhysicalDevice));
        assert!(matches!(select_device(Vec::new()), Err(SelectionError::NoPhysicalDevice)));
    }

    #[test]
    fn test_discrete_beats_integrated_with_equal_limit() {
        let candidates = vec![
            eligible("A", vk::PhysicalDeviceType::INTEGRATED_GPU, 4096),
            eligible("B", vk::PhysicalDeviceType::DISCRETE_GPU, 4096),
        ];
        assert_eq!(candidates[0].score(), 4096);
        assert_eq!(candidates[1].score(), 5096);
        assert_eq!(selected_name(candidates), "B");
    }

    #[test]
    fn test_discrete_beats_integrated_with_lower_limit() {
        let candidates = vec![
            eligible("integrated", vk::PhysicalDeviceType::INTEGRATED_GPU, 8192),
            eligible("discrete", vk::PhysicalDeviceType::DISCRETE_GPU, 8192),
            eligible("small integrated", vk::PhysicalDeviceType::INTEGRATED_GPU, 4096),
        ];
        assert_eq!(selected_name(candidates), "discrete");
    }

    #[test]
    fn test_large_limit_can_outweigh_discrete_bonus() {
        let candidates = vec![
            eligible("discrete", vk::PhysicalDeviceType::DISCRETE_GPU, 4096),
            eligible("integrated", vk::PhysicalDeviceType::INTEGRATED_GPU, 16384),
        ];
        assert_eq!(selected_name(candidates), "integrated");
    }

    #[test]
    fn test_same_type_larger_limit_wins() {
        let candidates = vec![
            eligible("small", vk::PhysicalDeviceType::DISCRETE_GPU, 8192),
            eligible("large", vk::PhysicalDeviceType::DISCRETE_GPU, 16384),
            eligible("medium", vk::PhysicalDeviceType::DISCRETE_GPU, 12288),
        ];
        assert_eq!(selected_name(candidates), "large");
    }

    #[test]
    fn test_ties_resolve_to_first_enumerated() {
        let candidates = vec![
            eligible("first", vk::PhysicalDeviceType::VIRTUAL_GPU, 4096),
            eligible("second", vk::PhysicalDeviceType::VIRTUAL_GPU, 4096),
            eligible("third", vk::PhysicalDeviceType::CPU, 4096),
        ];
        assert_eq!(select_best_index(&candidates), Ok(0));
    }

    #[test]
    fn test_missing_swapchain_fails() {
        let candidate = PhysicalDeviceCandidate::builder(vk::PhysicalDevice::null())
            .name("no swapchain")
            .device_type(vk::PhysicalDeviceType::DISCRETE_GPU)
            .max_image_dimension_2d(16384)
            .queue_family(QueueCapability::Graphics, 0)
            .present_family(Some(0))
            .extension("VK_KHR_maintenance1")
            .build();

        assert_eq!(
            candidate.ineligibility(),
            Some(Ineligibility::MissingExtension(SWAPCHAIN.to_string()))
        );
        assert_eq!(
            select_best_index(&[candidate]),
            Err(SelectionError::NoSuitableDevice { candidates: 1 })
        );
    }

    #[test]
    fn test_no_presentation_queue_fails_instead_of_falling_back() {
        let candidates: Vec<_> = ["first", "second"]
            .into_iter()
            .map(|name| {
                PhysicalDeviceCandidate::builder(vk::PhysicalDevice::null())
                    .name(name)
                    .device_type(vk::PhysicalDeviceType::DISCRETE_GPU)
                    .queue_family(QueueCapability::Graphics, 0)
                    .present_family(None)
                    .extension(SWAPCHAIN)
                    .build()
            })
            .collect();

        assert!(candidates.iter().all(|c| c.ineligibility() == Some(Ineligibility::NoPresentQueue)));
        assert!(matches!(
            select_device(candidates),
            Err(SelectionError::NoSuitableDevice { candidates: 2 })
        ));
    }

    #[test]
    fn test_no_graphics_queue_is_ineligible() {
        let candidate = PhysicalDeviceCandidate::builder(vk::PhysicalDevice::null())
            .queue_family(QueueCapability::Compute, 0)
            .present_family(Some(0))
            .extension(SWAPCHAIN)
            .build();
        assert_eq!(candidate.ineligibility(), Some(Ineligibility::NoGraphicsQueue));
    }

    #[test]
    fn test_never_selects_ineligible_candidate() {
        // A high scoring device missing each requirement in turn, next to a weak eligible one.
        let strong = |present: Option<u32>, graphics: bool, swapchain: bool| {
            let mut builder = PhysicalDeviceCandidate::builder(vk::PhysicalDevice::null())
                .name("strong")
                .device_type(vk::PhysicalDeviceType::DISCRETE_GPU)
                .max_image_dimension_2d(32768)
                .present_family(present);
            if graphics {
                builder = builder.queue_family(QueueCapability::Graphics, 0);
            }
            if swapchain {
                builder = builder.extension(SWAPCHAIN);
            }
            builder.build()
        };

        for (present, graphics, swapchain) in [
            (None, true, true),
            (Some(0), false, true),
            (Some(0), true, false),
            (None, false, false),
        ] {
            let candidates = vec![
                strong(present, graphics, swapchain),
                eligible("weak", vk::PhysicalDeviceType::CPU, 1024),
                strong(present, graphics, swapchain),
            ];
            let chosen = select_device(candidates).unwrap();
            assert!(chosen.is_eligible());
            assert_eq!(chosen.name(), "weak");
        }
    }

    #[test]
    fn test_score_saturates() {
        let candidate = eligible("huge", vk::PhysicalDeviceType::DISCRETE_GPU, u32::MAX);
        assert_eq!(candidate.score(), u32::MAX);
    }

    #[test]
    fn test_builder_copies_driver_properties() {
        let mut properties = vk::PhysicalDeviceProperties {
            vendor_id: 0x10de,
            device_id: 0x2484,
            api_version: vk::make_api_version(0, 1, 3, 250),
            device_type: vk::PhysicalDeviceType::DISCRETE_GPU,
            ..Default::default()
        };
        properties.limits.max_image_dimension2_d = 32768;
        for (dst, src) in properties.device_name.iter_mut().zip(b"Test GPU\0") {
            *dst = *src as _;
        }

        let candidate = PhysicalDeviceCandidate::builder(vk::PhysicalDevice::null())
            .properties(&properties)
            .build();

        assert_eq!(candidate.name(), "Test GPU");
        assert_eq!(candidate.max_image_dimension_2d(), 32768);
        assert_eq!(
            candidate.to_string(),
            "Test GPU (vulkan 1.3.250 vendorId:deviceId 4318:9348 type discrete)"
        );
    }

    #[test]
    fn test_capability_order_matches_flag_bits() {
        let bits: Vec<u32> = QueueCapability::ALL.iter().map(|c| c.flag().as_raw()).collect();
        let mut sorted = bits.clone();
        sorted.sort_unstable();
        assert_eq!(bits, sorted);
    }
}
