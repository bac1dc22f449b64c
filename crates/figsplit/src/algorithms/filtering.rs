use crate::{error::Result, traits::BoxPostProcessor, types::BoundingBox};

/// Drops boxes lying entirely inside a larger accepted box.
///
/// Framed panels whose content is separated from the frame by a white gap
/// label as a frame component plus inner components; only the frame is kept.
#[derive(Debug, Clone, Default)]
pub struct NestedBoxFilter;

impl BoxPostProcessor for NestedBoxFilter {
    fn process(&self, boxes: &mut Vec<BoundingBox>) -> Result<()> {
        // Visit largest first so an outer box is kept before its contents are seen
        let mut by_area: Vec<usize> = (0..boxes.len()).collect();
        by_area.sort_by(|&a, &b| boxes[b].area().cmp(&boxes[a].area()).then(a.cmp(&b)));

        let mut kept: Vec<usize> = Vec::new();
        for i in by_area {
            let inner = &boxes[i];
            let nested = kept.iter().any(|&k| contains(&boxes[k], inner));
            if !nested {
                kept.push(i);
            }
        }

        // restore the incoming order
        kept.sort_unstable();
        let retained: Vec<BoundingBox> = kept.into_iter().map(|i| boxes[i]).collect();
        *boxes = retained;
        Ok(())
    }
}

fn contains(outer: &BoundingBox, inner: &BoundingBox) -> bool {
    outer.x0 <= inner.x0 && outer.y0 <= inner.y0 && outer.x1 >= inner.x1 && outer.y1 >= inner.y1
}

/// Keeps at most `max` boxes, preferring the largest.
#[derive(Debug, Clone)]
pub struct LargestBoxesFilter {
    pub max: usize,
}

impl BoxPostProcessor for LargestBoxesFilter {
    fn process(&self, boxes: &mut Vec<BoundingBox>) -> Result<()> {
        if boxes.len() <= self.max {
            return Ok(());
        }

        let mut by_area: Vec<usize> = (0..boxes.len()).collect();
        by_area.sort_by(|&a, &b| boxes[b].area().cmp(&boxes[a].area()).then(a.cmp(&b)));
        by_area.truncate(self.max);
        by_area.sort_unstable();

        let retained: Vec<BoundingBox> = by_area.into_iter().map(|i| boxes[i]).collect();
        *boxes = retained;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_boxes_removed_order_kept() {
        let mut boxes = vec![
            BoundingBox::new(20, 20, 40, 40),
            BoundingBox::new(0, 0, 100, 100),
            BoundingBox::new(120, 0, 200, 100),
        ];
        NestedBoxFilter.process(&mut boxes).unwrap();
        assert_eq!(
            boxes,
            vec![BoundingBox::new(0, 0, 100, 100), BoundingBox::new(120, 0, 200, 100)]
        );
    }

    #[test]
    fn test_overlapping_but_not_nested_kept() {
        let mut boxes = vec![BoundingBox::new(0, 0, 60, 60), BoundingBox::new(40, 40, 100, 100)];
        NestedBoxFilter.process(&mut boxes).unwrap();
        assert_eq!(boxes.len(), 2);
    }

    #[test]
    fn test_largest_boxes_filter() {
        let mut boxes = vec![
            BoundingBox::new(0, 0, 10, 10),
            BoundingBox::new(20, 0, 60, 40),
            BoundingBox::new(70, 0, 90, 20),
        ];
        LargestBoxesFilter { max: 2 }.process(&mut boxes).unwrap();
        assert_eq!(
            boxes,
            vec![BoundingBox::new(20, 0, 60, 40), BoundingBox::new(70, 0, 90, 20)]
        );
    }
}
