use super::{constants, device::VulkanDevice};
use crate::error::Result;
use log::*;
use vulkanalia::vk::{self, DeviceV1_0, Handle, HasBuilder};
use vulkanalia::Device;

/// Where a `render` call is in the acquire/submit/present sequence.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum FrameState {
    #[default]
    Idle,
    Acquiring,
    Submitted,
    Presenting,
}

impl FrameState {
    pub fn next(self) -> FrameState {
        match self {
            FrameState::Idle => FrameState::Acquiring,
            FrameState::Acquiring => FrameState::Submitted,
            FrameState::Submitted => FrameState::Presenting,
            FrameState::Presenting => FrameState::Idle,
        }
    }

    /// Returns to `Idle` for a new frame, yielding the state an unfinished
    /// previous frame stopped in.
    pub fn restart(&mut self) -> Option<FrameState> {
        match std::mem::take(self) {
            FrameState::Idle => None,
            abandoned => Some(abandoned),
        }
    }
}

/// Semaphores and fences indexed by frame in flight, plus the fence that
/// last claimed each swapchain image.
#[derive(Debug)]
pub struct FrameSync {
    device: Device,
    pub image_available: Vec<vk::Semaphore>,
    pub render_finished: Vec<vk::Semaphore>,
    pub in_flight_fences: Vec<vk::Fence>,
    pub images_in_flight: Vec<vk::Fence>,
}

impl FrameSync {
    pub unsafe fn create(device: &VulkanDevice, image_count: usize) -> Result<FrameSync> {
        let semaphore_info = vk::SemaphoreCreateInfo::builder();
        // Signaled so the first wait on each frame returns immediately.
        let fence_info = vk::FenceCreateInfo::builder().flags(vk::FenceCreateFlags::SIGNALED);

        let mut sync = FrameSync {
            device: device.vk_device.clone(),
            image_available: Vec::with_capacity(constants::MAX_FRAMES_IN_FLIGHT),
            render_finished: Vec::with_capacity(constants::MAX_FRAMES_IN_FLIGHT),
            in_flight_fences: Vec::with_capacity(constants::MAX_FRAMES_IN_FLIGHT),
            images_in_flight: vec![vk::Fence::null(); image_count],
        };

        for _ in 0..constants::MAX_FRAMES_IN_FLIGHT {
            sync.image_available
                .push(device.vk_device.create_semaphore(&semaphore_info, None)?);
            sync.render_finished
                .push(device.vk_device.create_semaphore(&semaphore_info, None)?);
            sync.in_flight_fences
                .push(device.vk_device.create_fence(&fence_info, None)?);
        }

        Ok(sync)
    }
}

impl Drop for FrameSync {
    fn drop(&mut self) {
        unsafe {
            self.in_flight_fences
                .iter()
                .for_each(|f| self.device.destroy_fence(*f, None));
            self.render_finished
                .iter()
                .for_each(|s| self.device.destroy_semaphore(*s, None));
            self.image_available
                .iter()
                .for_each(|s| self.device.destroy_semaphore(*s, None));
        }
        debug!("Destroyed synchronization objects.");
    }
}
