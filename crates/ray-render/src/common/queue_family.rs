use ash::vk;

/// Family chosen for each queue role. Roles may share a family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub transfer: Option<u32>,
    pub compute: Option<u32>,
}

impl QueueFamilyIndices {
    /// Dedicated compute-only and transfer-only families first, then the
    /// first family carrying each remaining bit.
    pub fn partition(families: &[vk::QueueFlags]) -> Self {
        let mut indices = Self::default();

        for (index, &flags) in (0u32..).zip(families.iter()) {
            if indices.compute.is_none() && flags == vk::QueueFlags::COMPUTE {
                indices.compute = Some(index);
            }
            if indices.transfer.is_none() && flags == vk::QueueFlags::TRANSFER {
                indices.transfer = Some(index);
            }
        }

        for (index, &flags) in (0u32..).zip(families.iter()) {
            if indices.is_complete() {
                break;
            }
            if indices.graphics.is_none() && flags.contains(vk::QueueFlags::GRAPHICS) {
                indices.graphics = Some(index);
            }
            if indices.compute.is_none() && flags.contains(vk::QueueFlags::COMPUTE) {
                indices.compute = Some(index);
            }
            if indices.transfer.is_none() && flags.contains(vk::QueueFlags::TRANSFER) {
                indices.transfer = Some(index);
            }
        }

        indices
    }

    pub fn assigned_count(&self) -> u32 {
        [self.graphics, self.transfer, self.compute]
            .iter()
            .filter(|family| family.is_some())
            .count() as u32
    }

    pub fn is_complete(&self) -> bool {
        self.assigned_count() == 3
    }

    /// Sorted distinct families in use, for concurrent sharing.
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families: Vec<u32> = [self.graphics, self.transfer, self.compute]
            .into_iter()
            .flatten()
            .collect();
        families.sort_unstable();
        families.dedup();
        families
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSlot {
    pub family: u32,
    pub index: u32,
}

/// Queue create requests plus where each role finds its queue afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuePlan {
    pub requests: Vec<(u32, u32)>,
    pub graphics: QueueSlot,
    pub transfer: QueueSlot,
    pub compute: QueueSlot,
}

impl QueuePlan {
    /// One request per distinct family. A role landing on a family already
    /// requested takes the next queue index there, bounded by what the family
    /// offers. `queue_counts` is indexed by family.
    pub fn new(indices: &QueueFamilyIndices, queue_counts: &[u32]) -> Option<Self> {
        let mut requests: Vec<(u32, u32)> = Vec::new();
        let mut take = |family: u32| -> Option<QueueSlot> {
            let available = *queue_counts.get(family as usize)?;
            if available == 0 {
                return None;
            }
            let used = match requests.iter_mut().find(|(f, _)| *f == family) {
                Some((_, count)) => {
                    let used = *count;
                    *count = (*count + 1).min(available);
                    used
                }
                None => {
                    requests.push((family, 1));
                    0
                }
            };
            Some(QueueSlot {
                family,
                index: used.min(available - 1),
            })
        };

        let graphics = take(indices.graphics?)?;
        let transfer = take(indices.transfer?)?;
        let compute = take(indices.compute?)?;

        Some(Self {
            requests,
            graphics,
            transfer,
            compute,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const G: vk::QueueFlags = vk::QueueFlags::GRAPHICS;
    const C: vk::QueueFlags = vk::QueueFlags::COMPUTE;
    const T: vk::QueueFlags = vk::QueueFlags::TRANSFER;

    #[test]
    fn dedicated_families_are_preferred() {
        let families = [G | C | T, T, C];
        let indices = QueueFamilyIndices::partition(&families);
        assert_eq!(indices.graphics, Some(0));
        assert_eq!(indices.transfer, Some(1));
        assert_eq!(indices.compute, Some(2));
        assert_eq!(indices.unique_families(), vec![0, 1, 2]);
    }

    #[test]
    fn non_exact_masks_fall_back_to_first_carrier() {
        // compute family also advertises transfer, so it is not compute-only
        let families = [G | C | T, C | T, T];
        let indices = QueueFamilyIndices::partition(&families);
        assert_eq!(indices.graphics, Some(0));
        assert_eq!(indices.transfer, Some(2));
        assert_eq!(indices.compute, Some(0));
    }

    #[test]
    fn single_family_serves_every_role() {
        let indices = QueueFamilyIndices::partition(&[G | C | T]);
        assert!(indices.is_complete());
        assert_eq!(indices.unique_families(), vec![0]);
    }

    #[test]
    fn missing_capability_leaves_role_unassigned() {
        let indices = QueueFamilyIndices::partition(&[G | T]);
        assert_eq!(indices.assigned_count(), 2);
        assert!(!indices.is_complete());
        assert_eq!(indices.compute, None);
    }

    #[test]
    fn shared_family_collapses_into_one_request() {
        let indices = QueueFamilyIndices::partition(&[G | C | T, T]);
        let plan = QueuePlan::new(&indices, &[4, 1]).unwrap();
        assert_eq!(plan.requests, vec![(0, 2), (1, 1)]);
        assert_eq!(plan.graphics, QueueSlot { family: 0, index: 0 });
        assert_eq!(plan.transfer, QueueSlot { family: 1, index: 0 });
        assert_eq!(plan.compute, QueueSlot { family: 0, index: 1 });
    }

    #[test]
    fn queue_indices_are_clamped_to_family_size() {
        let indices = QueueFamilyIndices::partition(&[G | C | T]);
        let plan = QueuePlan::new(&indices, &[1]).unwrap();
        assert_eq!(plan.requests, vec![(0, 1)]);
        assert_eq!(plan.transfer.index, 0);
        assert_eq!(plan.compute.index, 0);
    }

    #[test]
    fn incomplete_indices_have_no_plan() {
        let indices = QueueFamilyIndices::partition(&[G]);
        assert!(QueuePlan::new(&indices, &[1]).is_none());
    }
}
