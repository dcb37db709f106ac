/// Receives a notification every time the rendered shape is replaced.
pub trait ShapeListener {
    fn shape_changed(&mut self);
}

impl<F> ShapeListener for F
where
    F: FnMut(),
{
    fn shape_changed(&mut self) {
        self()
    }
}

/// Flat vertex data for the line list.
///
/// `positions` holds x,y pairs and `colors` holds r,g,b triples, one per
/// vertex. Callers must keep the two in step (`colors.len() / 3 ==
/// positions.len() / 2`); nothing checks it at runtime.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryBuffer {
    positions: Vec<f32>,
    colors: Vec<f32>,
}

impl GeometryBuffer {
    pub const POSITION_COMPONENTS: u32 = 2;
    pub const COLOR_COMPONENTS: u32 = 3;

    pub fn new(positions: Vec<f32>, colors: Vec<f32>) -> Self {
        Self { positions, colors }
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn colors(&self) -> &[f32] {
        &self.colors
    }

    pub fn vertex_count(&self) -> u32 {
        (self.positions.len() / Self::POSITION_COMPONENTS as usize) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_count() == 0
    }

    /// Swaps in a new shape in one step, never mixing old and new data.
    pub(crate) fn replace(&mut self, positions: Vec<f32>, colors: Vec<f32>) {
        *self = Self::new(positions, colors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_count_follows_positions() {
        let buffer = GeometryBuffer::new(vec![0.0, 0.0, 1.0, 1.0, 2.0], vec![1.0; 6]);
        assert_eq!(buffer.vertex_count(), 2);
        assert!(GeometryBuffer::default().is_empty());
    }

    #[test]
    fn replace_swaps_both_sequences() {
        let mut buffer = GeometryBuffer::new(vec![0.0; 4], vec![0.0; 6]);
        buffer.replace(vec![1.0; 8], vec![0.5; 12]);
        assert_eq!(buffer.positions(), &[1.0; 8]);
        assert_eq!(buffer.colors(), &[0.5; 12]);
        assert_eq!(buffer.vertex_count(), 4);
    }
}
