use spoiler_mask::{
    Descriptor, HEADER_SIZE, Header, SpoilerError, atlas_dimensions, deserialize, generate,
    serialize,
};

fn reference_descriptor() -> Descriptor {
    Descriptor {
        frames_count: 60,
        frame_duration: 33,
        canvas_size: 100,
        particles_count: 2000,
        particle_sprites_count: 5,
        particle_size_min: 1.5,
        particle_size_max: 2.0,
        particle_fade_in_duration: 200,
        particle_shown_duration: 400,
        particle_fade_out_duration: 200,
        seed: 7,
    }
}

#[test]
fn reference_mask_round_trips_through_the_cache_format() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let mask = generate(&reference_descriptor()).unwrap();
    assert_eq!(mask.image().dimensions(), (1000, 600));
    assert_eq!(mask.frames_count(), 60);
    assert_eq!(mask.frame_duration(), 33);
    assert_eq!(mask.canvas_size(), 100);

    // Something was painted, and every pixel is gray with coverage as alpha.
    assert!(mask.image().pixels().any(|px| px.0[3] > 0));
    assert!(
        mask.image()
            .pixels()
            .all(|px| px.0[0] == px.0[3] && px.0[1] == px.0[3] && px.0[2] == px.0[3])
    );

    let bytes = serialize(&mask).unwrap();
    let header = Header::from_bytes(&bytes).unwrap();
    assert_eq!(header.frames_count, 60);
    assert_eq!(header.canvas_size, 100);
    assert_eq!(header.frame_duration, 33);
    assert_eq!(header.data_length as usize, bytes.len() - HEADER_SIZE);

    let decoded = deserialize(&bytes, Some(&mask.validator())).unwrap();
    assert_eq!(decoded, mask);
}

#[test]
fn atlas_dimensions_follow_the_frame_grid() {
    for (frames, canvas) in [(1, 8), (7, 5), (10, 6), (11, 6), (23, 4), (60, 3)] {
        let descriptor = Descriptor {
            frames_count: frames,
            frame_duration: 100,
            canvas_size: canvas,
            particles_count: 30,
            particle_fade_in_duration: 20,
            particle_shown_duration: 10,
            particle_fade_out_duration: 20,
            ..Descriptor::default()
        };
        let mask = generate(&descriptor).unwrap();
        assert_eq!(
            mask.image().dimensions(),
            atlas_dimensions(frames, canvas),
            "{frames} frames of {canvas}px"
        );
        let columns = frames.min(10);
        let rows = frames.div_ceil(10);
        assert_eq!(mask.image().dimensions(), (columns * canvas, rows * canvas));
    }
}

#[test]
fn generation_is_deterministic_per_seed() {
    let small = Descriptor {
        canvas_size: 24,
        frames_count: 30,
        particles_count: 200,
        ..reference_descriptor()
    };
    let a = generate(&small).unwrap();
    let b = generate(&small).unwrap();
    assert_eq!(a, b);

    let other = generate(&Descriptor { seed: 8, ..small }).unwrap();
    assert_ne!(a, other);
}

#[test]
fn every_frame_carries_paint() {
    // Starts are phased over the whole loop, so some particle is alive in every frame,
    // including frame 0 where late starters show up through the wrapped phase.
    let descriptor = Descriptor {
        canvas_size: 16,
        frames_count: 10,
        frame_duration: 100,
        particles_count: 10,
        particle_fade_in_duration: 150,
        particle_shown_duration: 100,
        particle_fade_out_duration: 150,
        ..reference_descriptor()
    };
    let mask = generate(&descriptor).unwrap();
    for index in 0..10 {
        let rect = mask.frame(index).source;
        let painted = (rect.y..rect.y + rect.height).any(|y| {
            (rect.x..rect.x + rect.width).any(|x| mask.image().get_pixel(x, y).0[3] > 0)
        });
        assert!(painted, "frame {index} is empty");
    }
}

#[test]
fn malformed_descriptors_fail_without_an_asset() {
    let too_short = Descriptor {
        frames_count: 2,
        frame_duration: 10,
        ..reference_descriptor()
    };
    assert!(matches!(
        generate(&too_short),
        Err(SpoilerError::Validation(_))
    ));

    let inverted = Descriptor {
        particle_size_min: 3.0,
        particle_size_max: 2.0,
        ..reference_descriptor()
    };
    assert!(generate(&inverted).is_err());

    let no_particles = Descriptor {
        particles_count: 0,
        ..reference_descriptor()
    };
    assert!(generate(&no_particles).is_err());
}
