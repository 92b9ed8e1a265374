/// A value with a leading replica axis, one entry per local device. The axis
/// is never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Replicated<T> {
    replicas: Vec<T>,
}

impl<T> Replicated<T> {
    /// `None` if `replicas` is empty.
    pub fn new(replicas: Vec<T>) -> Option<Self> {
        if replicas.is_empty() {
            return None;
        }
        Some(Self { replicas })
    }

    pub fn from_single(value: T) -> Self {
        Self {
            replicas: vec![value],
        }
    }

    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    pub fn first(&self) -> &T {
        &self.replicas[0]
    }

    /// Strip the replica axis by keeping replica 0.
    pub fn into_first(self) -> T {
        let mut replicas = self.replicas;
        replicas.swap_remove(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.replicas.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.replicas
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Replicated<U> {
        Replicated {
            replicas: self.replicas.into_iter().map(f).collect(),
        }
    }

    pub fn map_ref<U>(&self, f: impl FnMut(&T) -> U) -> Replicated<U> {
        Replicated {
            replicas: self.replicas.iter().map(f).collect(),
        }
    }
}

impl<T: Clone> Replicated<T> {
    /// Re-attach a replica axis of length `n` (at least 1).
    pub fn broadcast(value: T, n: usize) -> Self {
        Self {
            replicas: vec![value; n.max(1)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_and_reattach_keeps_shape() {
        let replicated = Replicated::new(vec![1, 2, 3]).unwrap();
        let n = replicated.len();
        let single = replicated.into_first();
        assert_eq!(single, 1);
        let back = Replicated::broadcast(single + 10, n);
        assert_eq!(back.len(), 3);
        assert!(back.iter().all(|v| *v == 11));
    }

    #[test]
    fn test_broadcast_never_empty() {
        assert_eq!(Replicated::broadcast("x", 0).len(), 1);
    }

    #[test]
    fn test_empty_axis_rejected() {
        assert!(Replicated::<u8>::new(vec![]).is_none());
    }
}
