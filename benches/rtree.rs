#![feature(test)]

extern crate rand;
extern crate spatial;
extern crate test;

use rand::Rng;
use spatial::{RTree, Rect};
use test::Bencher;

fn generate_guttman_tree_with_size(count: usize) -> RTree<usize> {
    let mut tree = RTree::with_guttman(8, 32).unwrap();
    let mut rng = rand::thread_rng();
    for i in 0..count {
        let (x, y) = (rng.gen_range(0.0, 1000.0), rng.gen_range(0.0, 1000.0));
        tree.insert(i, Rect::new(x, y, x + 1.0, y + 1.0)).unwrap();
    }
    tree
}

fn generate_rstar_tree_with_size(count: usize) -> RTree<usize> {
    let mut tree = RTree::with_rstar(8, 32).unwrap();
    let mut rng = rand::thread_rng();
    for i in 0..count {
        let (x, y) = (rng.gen_range(0.0, 1000.0), rng.gen_range(0.0, 1000.0));
        tree.insert(i, Rect::new(x, y, x + 1.0, y + 1.0)).unwrap();
    }
    tree
}

#[bench]
fn insert_guttman_rng_2d_100(b: &mut Bencher) {
    b.iter(|| {
        generate_guttman_tree_with_size(100);
    });
}

#[bench]
fn insert_guttman_rng_2d_1000(b: &mut Bencher) {
    b.iter(|| {
        generate_guttman_tree_with_size(1000);
    });
}

#[bench]
fn insert_guttman_rng_2d_10000(b: &mut Bencher) {
    b.iter(|| {
        generate_guttman_tree_with_size(10000);
    });
}

#[bench]
fn insert_rstar_rng_2d_100(b: &mut Bencher) {
    b.iter(|| {
        generate_rstar_tree_with_size(100);
    });
}

#[bench]
fn insert_rstar_rng_2d_1000(b: &mut Bencher) {
    b.iter(|| {
        generate_rstar_tree_with_size(1000);
    });
}

#[bench]
fn insert_rstar_rng_2d_10000(b: &mut Bencher) {
    b.iter(|| {
        generate_rstar_tree_with_size(10000);
    });
}

fn search_rng_2d(b: &mut Bencher, tree: &RTree<usize>) {
    let mut rng = rand::thread_rng();
    b.iter(|| {
        let (x, y) = (rng.gen_range(0.0, 1000.0), rng.gen_range(0.0, 1000.0));
        tree.query(Rect::new(x, y, x + 20.0, y + 20.0)).unwrap().count();
    });
}

#[bench]
fn search_guttman_rng_2d_1000(b: &mut Bencher) {
    let tree = generate_guttman_tree_with_size(1000);
    search_rng_2d(b, &tree);
}

#[bench]
fn search_rstar_rng_2d_1000(b: &mut Bencher) {
    let tree = generate_rstar_tree_with_size(1000);
    search_rng_2d(b, &tree);
}
